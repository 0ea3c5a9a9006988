use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use crate::{
    FlowbaseError, Result,
    executors::{Executor, ExecutorInput, parse_config, template},
    model::NodeCategory,
    runtime::WorkflowContext,
};

const STEP_LABEL: &str = "chat-webhook";
/// Most chat services cap message bodies at 2000 characters.
const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ChatWebhookConfig {
    variable_name: String,
    webhook_url: String,
    content: String,
    username: Option<String>,
}

/// Posts a message to a chat webhook and stores the outcome under the
/// configured variable name as `{ "messageSent": true, "message": content }`.
pub struct ChatWebhookExecutor;

#[async_trait]
impl Executor for ChatWebhookExecutor {
    fn category(&self) -> NodeCategory {
        NodeCategory::ChatWebhook
    }

    fn schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "required": ["variable_name", "webhook_url", "content"],
            "properties": {
                "variable_name": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Context variable the outcome is stored under, supports template variables"
                },
                "webhook_url": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Webhook endpoint, supports template variables"
                },
                "content": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Message body, supports template variables; truncated to 2000 characters"
                },
                "username": {
                    "type": ["string", "null"],
                    "description": "Display name for the posted message"
                }
            }
        })
    }

    async fn run(
        &self,
        input: &ExecutorInput,
    ) -> Result<WorkflowContext> {
        let config = parse_config::<ChatWebhookConfig>(&self.schema(), &input.node.data)?;
        let ctx = &input.context;

        let variable_name = template::resolve_template(ctx, &config.variable_name)?;
        if ctx.contains(&variable_name) {
            return Err(FlowbaseError::DuplicateVariable(variable_name));
        }

        let webhook_url = template::resolve_template(ctx, &config.webhook_url)?;
        let content: String = template::resolve_template(ctx, &config.content)?.chars().take(MAX_CONTENT_CHARS).collect();
        let username = config.username;

        let sent = content.clone();
        let result = input
            .steps
            .run_once(&input.node.id, STEP_LABEL, || async move {
                let mut payload = json!({ "content": sent });
                if let Some(username) = username {
                    payload["username"] = JsonValue::String(username);
                }

                let client = reqwest::Client::new();
                let res = client
                    .post(&webhook_url)
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|err| FlowbaseError::Downstream(format!("webhook error: {}", err)))?;

                let status = res.status();
                if !status.is_success() {
                    return Err(FlowbaseError::Downstream(format!(
                        "webhook rejected the message with status {}",
                        status.as_u16()
                    )));
                }

                Ok(json!(true))
            })
            .await?;

        ctx.insert(&variable_name, json!({ "messageSent": result, "message": content }))
    }
}
