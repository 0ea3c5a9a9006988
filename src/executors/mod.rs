//! Node executors.
//!
//! One executor per [`NodeType`], resolved through the [`ExecutorRegistry`].
//! The trait's provided `execute` wraps the type-specific `run` with the
//! universal status contract: `loading` on entry, then exactly one terminal
//! `success` or `error` before returning.

pub mod template;

mod chat_webhook;
mod http_request;
#[cfg(test)]
pub(crate) mod stub_http;
mod text_model;
mod trigger;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::{
    FlowbaseError, Result,
    model::{NodeCategory, NodeModel, NodeType},
    runtime::{StepRecorder, WorkflowContext},
    status::{NodeEvent, StatusMessage, StatusPublisher},
    store::Store,
    utils,
};

pub use chat_webhook::ChatWebhookExecutor;
pub use http_request::HttpRequestExecutor;
pub use text_model::TextModelExecutor;
pub use trigger::TriggerExecutor;

/// Everything one node invocation needs.
#[derive(Clone)]
pub struct ExecutorInput {
    /// execution id
    pub eid: String,
    /// the node being executed (id + config)
    pub node: NodeModel,
    /// owner of the workflow; scopes credential lookups
    pub user_id: String,
    /// context accumulated by the preceding nodes
    pub context: WorkflowContext,

    pub publisher: Arc<dyn StatusPublisher>,
    pub steps: StepRecorder,
    pub store: Arc<Store>,
}

#[async_trait]
pub trait Executor: Send + Sync {
    /// Returns the category of the nodes this executor handles.
    fn category(&self) -> NodeCategory;

    /// Returns the JSON Schema the node's `data` is validated against.
    fn schema(&self) -> JsonValue;

    /// Executes the node's own behavior and returns the extended context.
    async fn run(
        &self,
        input: &ExecutorInput,
    ) -> Result<WorkflowContext>;

    /// Runs the node with the status contract applied.
    async fn execute(
        &self,
        input: &ExecutorInput,
    ) -> Result<WorkflowContext> {
        let category = input.node.node_type.category();
        input.publisher.publish(StatusMessage::node(
            &input.eid,
            &input.node.id,
            category.as_ref(),
            NodeEvent::Loading(utils::time::time_millis()),
        ));

        match self.run(input).await {
            Ok(ctx) => {
                input.publisher.publish(StatusMessage::node(
                    &input.eid,
                    &input.node.id,
                    category.as_ref(),
                    NodeEvent::Success(utils::time::time_millis()),
                ));
                Ok(ctx)
            }
            Err(err) => {
                input.publisher.publish(StatusMessage::node(
                    &input.eid,
                    &input.node.id,
                    category.as_ref(),
                    NodeEvent::Error {
                        at: utils::time::time_millis(),
                        reason: err.to_string(),
                    },
                ));
                Err(err)
            }
        }
    }
}

/// Validate node config against `schema` and deserialize it.
pub(crate) fn parse_config<T: DeserializeOwned>(
    schema: &JsonValue,
    data: &JsonValue,
) -> Result<T> {
    jsonschema::validate(schema, data).map_err(|err| FlowbaseError::NodeConfig(err.to_string()))?;
    serde_json::from_value::<T>(data.clone()).map_err(|err| FlowbaseError::NodeConfig(err.to_string()))
}

/// Maps node types to their executors.
#[derive(Clone)]
pub struct ExecutorRegistry {
    executors: HashMap<NodeType, Arc<dyn Executor>>,
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new(crate::config::Config::default().http_request_timeout_ms)
    }
}

impl ExecutorRegistry {
    pub fn new(http_timeout_ms: u64) -> Self {
        let mut registry = Self {
            executors: HashMap::new(),
        };

        let trigger: Arc<dyn Executor> = Arc::new(TriggerExecutor);
        registry.register(NodeType::Initial, trigger.clone());
        registry.register(NodeType::ManualTrigger, trigger.clone());
        registry.register(NodeType::StripeTrigger, trigger.clone());
        registry.register(NodeType::GoogleFormTrigger, trigger);
        registry.register(NodeType::HttpRequest, Arc::new(HttpRequestExecutor::new(http_timeout_ms)));
        registry.register(NodeType::TextModel, Arc::new(TextModelExecutor));
        registry.register(NodeType::ChatWebhook, Arc::new(ChatWebhookExecutor));

        registry
    }

    /// Replace or add the executor for a node type.
    pub fn register(
        &mut self,
        node_type: NodeType,
        executor: Arc<dyn Executor>,
    ) {
        self.executors.insert(node_type, executor);
    }

    pub fn resolve(
        &self,
        node_type: NodeType,
    ) -> Result<Arc<dyn Executor>> {
        self.executors
            .get(&node_type)
            .cloned()
            .ok_or_else(|| FlowbaseError::UnknownNodeType(node_type.as_ref().to_string()))
    }
}
