use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// Recorded output of one durable unit of work.
///
/// `id` is `{eid}:{nid}:{label}`; the presence of a row means the side
/// effect already happened and its output must be reused.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StepResult {
    pub id: String,
    pub eid: String,

    /// unit output as JSON
    pub output: String,
    pub timestamp: i64,
}

impl DbCollectionIden for StepResult {
    fn iden() -> StoreIden {
        StoreIden::Steps
    }
}
