use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// One status event persisted by the monitor.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EventRecord {
    pub id: String,
    pub eid: String,
    pub nid: String,

    /// event name ("Loading", "Success", "Error", "Running", ...)
    pub name: String,
    /// human-readable detail, such as an error reason
    pub message: Option<String>,
    pub timestamp: i64,
}

impl DbCollectionIden for EventRecord {
    fn iden() -> StoreIden {
        StoreIden::Events
    }
}
