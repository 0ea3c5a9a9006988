use serde::{Deserialize, Serialize};

use crate::common::Vars;

/// The event that starts a run.
///
/// `event_id` is the triggering event's own identifier and doubles as the
/// idempotency key: re-delivering the same event never produces a second
/// execution record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub workflow_id: String,
    pub event_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_data: Option<Vars>,
}

impl TriggerEvent {
    pub fn new(
        workflow_id: &str,
        event_id: &str,
    ) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            event_id: event_id.to_string(),
            initial_data: None,
        }
    }

    pub fn with_initial_data(
        mut self,
        data: Vars,
    ) -> Self {
        self.initial_data = Some(data);
        self
    }
}
