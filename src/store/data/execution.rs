use serde::{Deserialize, Serialize};

use crate::store::{DbCollectionIden, StoreIden};

/// Terminal-state machine of one run: Running, then Success or Failed.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
pub enum ExecutionState {
    Running,
    Success,
    Failed,
}

/// One durable record per triggering event.
///
/// `id` equals the triggering event id, which makes execution creation
/// naturally idempotent: a re-delivered event maps to the same record.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Execution {
    pub id: String,
    pub wid: String,

    pub state: String,
    /// final context as JSON, set on success
    pub output: Option<String>,
    /// failure summary, set on failure
    pub err: Option<String>,
    /// failure detail for debugging
    pub err_detail: Option<String>,
    pub start_time: i64,
    pub end_time: i64,
    pub timestamp: i64,
}

impl DbCollectionIden for Execution {
    fn iden() -> StoreIden {
        StoreIden::Executions
    }
}
