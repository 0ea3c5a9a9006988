use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::{
    Result,
    executors::{Executor, ExecutorInput},
    model::NodeCategory,
    runtime::WorkflowContext,
};

/// Pass-through executor for all trigger kinds.
///
/// Triggers carry no behavior during a run; the triggering event's initial
/// data is seeded into the context before the first node, so this executor
/// only participates in status emission.
pub struct TriggerExecutor;

#[async_trait]
impl Executor for TriggerExecutor {
    fn category(&self) -> NodeCategory {
        NodeCategory::Trigger
    }

    fn schema(&self) -> JsonValue {
        serde_json::json!({ "type": "object" })
    }

    async fn run(
        &self,
        input: &ExecutorInput,
    ) -> Result<WorkflowContext> {
        Ok(input.context.clone())
    }
}
