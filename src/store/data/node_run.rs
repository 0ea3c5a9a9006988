use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// Latest status of one node within one execution; id is `{eid}-{nid}`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NodeRun {
    pub id: String,
    pub eid: String,
    pub nid: String,

    pub status: String,
    pub err: Option<String>,
    pub start_time: i64,
    pub end_time: i64,
    pub timestamp: i64,
}

impl DbCollectionIden for NodeRun {
    fn iden() -> StoreIden {
        StoreIden::NodeRuns
    }
}
