mod credential;
mod event;
mod execution;
mod node_run;
mod step;
mod workflow;

use std::{error::Error, sync::Arc};

use sea_query::{Alias as SeaAlias, Cond, Expr as SeaExpr};
use serde_json::Value as JsonValue;

use crate::{FlowbaseError, store::query::Query};

use super::synclient::SynClient;

pub use credential::CredentialCollection;
pub use event::EventCollection;
pub use execution::ExecutionCollection;
pub use node_run::NodeRunCollection;
pub use step::StepCollection;
pub use workflow::WorkflowCollection;

pub type DbConnection = Arc<SynClient>;

fn map_db_err(err: impl Error) -> FlowbaseError {
    FlowbaseError::Store(err.to_string())
}

/// Build the WHERE condition from a query's equality filters.
fn into_query(q: &Query) -> Cond {
    let mut cond = Cond::all();
    for (key, value) in q.filters() {
        let col = SeaExpr::col(SeaAlias::new(key));
        cond = match value {
            JsonValue::String(s) => cond.add(col.eq(s.as_str())),
            JsonValue::Bool(b) => cond.add(col.eq(*b)),
            JsonValue::Number(n) if n.is_i64() => cond.add(col.eq(n.as_i64().unwrap_or_default())),
            other => cond.add(col.eq(other.to_string())),
        };
    }
    cond
}
