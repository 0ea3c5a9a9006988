use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::{
    Result,
    store::{Store, data::StepResult},
    utils,
};

/// Records completed units of work so a re-run of the same execution never
/// repeats an external side effect.
///
/// Each unit is keyed by `{event_id}:{node_id}:{label}`. When a key already
/// has a recorded output the stored value is returned and the closure is
/// never called.
#[derive(Clone)]
pub struct StepRecorder {
    eid: String,
    store: Arc<Store>,
}

impl StepRecorder {
    pub fn new(
        eid: &str,
        store: Arc<Store>,
    ) -> Self {
        Self {
            eid: eid.to_string(),
            store,
        }
    }

    /// Run `work` at most once for this execution, node and label.
    ///
    /// A failed attempt records nothing, so the unit runs again on retry. A
    /// store failure after a successful attempt is logged and the fresh
    /// value returned; the run does not fail over bookkeeping.
    pub async fn run_once<F, Fut>(
        &self,
        nid: &str,
        label: &str,
        work: F,
    ) -> Result<JsonValue>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<JsonValue>>,
    {
        let key = format!("{}:{}:{}", self.eid, nid, label);
        let steps = self.store.steps();

        if steps.exists(&key)? {
            let recorded = steps.find(&key)?;
            debug!("step {} already recorded, reusing output", key);
            return Ok(serde_json::from_str(&recorded.output)?);
        }

        let output = work().await?;

        let record = StepResult {
            id: key.clone(),
            eid: self.eid.clone(),
            output: output.to_string(),
            timestamp: utils::time::time_millis(),
        };
        if let Err(e) = steps.create(&record) {
            warn!("failed to record step {}: {}", key, e);
        }

        Ok(output)
    }
}
