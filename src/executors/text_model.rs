use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use crate::{
    FlowbaseError, Result,
    executors::{Executor, ExecutorInput, parse_config, template},
    model::NodeCategory,
    runtime::WorkflowContext,
};

const STEP_LABEL: &str = "generate-text";
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Serialize, Deserialize, Debug, Clone)]
struct TextModelConfig {
    variable_name: String,
    credential_id: String,
    model: String,
    system_prompt: Option<String>,
    user_prompt: String,
    // override for self-hosted or compatible providers
    base_url: Option<String>,
}

/// Generates text through an OpenAI-style chat completions endpoint and
/// stores the reply under the configured variable name as
/// `{ "aiResponse": text }`.
pub struct TextModelExecutor;

#[async_trait]
impl Executor for TextModelExecutor {
    fn category(&self) -> NodeCategory {
        NodeCategory::TextModel
    }

    fn schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "required": ["variable_name", "credential_id", "model", "user_prompt"],
            "properties": {
                "variable_name": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Context variable the reply is stored under, supports template variables"
                },
                "credential_id": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Id of the stored api key, scoped to the workflow owner"
                },
                "model": {
                    "type": "string",
                    "minLength": 1
                },
                "system_prompt": {
                    "type": ["string", "null"],
                    "description": "Supports template variables"
                },
                "user_prompt": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Supports template variables"
                },
                "base_url": {
                    "type": ["string", "null"],
                    "description": "Chat completions base url, defaults to the OpenAI api"
                }
            }
        })
    }

    async fn run(
        &self,
        input: &ExecutorInput,
    ) -> Result<WorkflowContext> {
        let config = parse_config::<TextModelConfig>(&self.schema(), &input.node.data)?;
        let ctx = &input.context;

        let variable_name = template::resolve_template(ctx, &config.variable_name)?;
        if ctx.contains(&variable_name) {
            return Err(FlowbaseError::DuplicateVariable(variable_name));
        }

        let system_prompt = match &config.system_prompt {
            Some(prompt) => template::resolve_template(ctx, prompt)?,
            None => DEFAULT_SYSTEM_PROMPT.to_string(),
        };
        let user_prompt = template::resolve_template(ctx, &config.user_prompt)?;

        let credential = input
            .store
            .credentials()
            .find(&config.credential_id)
            .map_err(|_| FlowbaseError::CredentialNotFound(config.credential_id.clone()))?;
        if credential.user_id != input.user_id {
            return Err(FlowbaseError::CredentialNotFound(config.credential_id.clone()));
        }

        let base_url = config.base_url.unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = config.model;
        let api_key = credential.value;

        let reply = input
            .steps
            .run_once(&input.node.id, STEP_LABEL, || async move {
                let request_body = json!({
                    "model": model,
                    "messages": [
                        { "role": "system", "content": system_prompt },
                        { "role": "user", "content": user_prompt }
                    ]
                });

                let client = reqwest::Client::new();
                let res = client
                    .post(format!("{}/chat/completions", base_url.trim_end_matches('/')))
                    .bearer_auth(api_key)
                    .json(&request_body)
                    .send()
                    .await
                    .map_err(|err| FlowbaseError::Downstream(format!("model provider error: {}", err)))?;

                let status = res.status();
                if !status.is_success() {
                    let detail = res.text().await.unwrap_or_default();
                    return Err(FlowbaseError::Downstream(format!(
                        "model provider returned {}: {}",
                        status.as_u16(),
                        detail
                    )));
                }

                let body = res
                    .json::<JsonValue>()
                    .await
                    .map_err(|err| FlowbaseError::Downstream(err.to_string()))?;
                let text = body
                    .pointer("/choices/0/message/content")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| FlowbaseError::Downstream("model response missing message content".to_string()))?;

                Ok(JsonValue::String(text.to_string()))
            })
            .await?;

        ctx.insert(&variable_name, json!({ "aiResponse": reply }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        executors::stub_http,
        model::{NodeModel, NodeType},
        runtime::StepRecorder,
        status::NoopPublisher,
        store::{Store, data::Credential},
        utils,
    };

    fn input(
        store: Arc<Store>,
        data: JsonValue,
    ) -> ExecutorInput {
        ExecutorInput {
            eid: "evt_1".to_string(),
            node: NodeModel {
                id: "n1".to_string(),
                name: "summarize".to_string(),
                node_type: NodeType::TextModel,
                data,
                retry: None,
            },
            user_id: "u1".to_string(),
            context: WorkflowContext::new(),
            publisher: Arc::new(NoopPublisher),
            steps: StepRecorder::new("evt_1", store.clone()),
            store,
        }
    }

    fn config() -> JsonValue {
        json!({
            "variable_name": "summary",
            "credential_id": "cred_1",
            "model": "gpt-4o-mini",
            "user_prompt": "Summarize"
        })
    }

    #[test]
    fn test_success_stores_ai_response() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let store = Arc::new(Store::mem());
        store
            .credentials()
            .create(&Credential {
                id: "cred_1".to_string(),
                user_id: "u1".to_string(),
                name: "openai".to_string(),
                value: "sk-test".to_string(),
                timestamp: utils::time::time_millis(),
            })
            .unwrap();

        rt.block_on(async {
            let addr = stub_http::serve_once(stub_http::response(
                "200 OK",
                "application/json",
                r#"{"choices":[{"message":{"content":"a summary"}}]}"#,
            ))
            .await;
            let input = input(
                store,
                json!({
                    "variable_name": "summary",
                    "credential_id": "cred_1",
                    "model": "gpt-4o-mini",
                    "user_prompt": "Summarize",
                    "base_url": format!("http://{}/v1", addr)
                }),
            );

            let ctx = TextModelExecutor.run(&input).await.unwrap();
            assert_eq!(ctx.lookup_path("summary"), Some(&json!({ "aiResponse": "a summary" })));
        });
    }

    #[test]
    fn test_missing_credential_is_fatal() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let store = Arc::new(Store::mem());
        let input = input(store, config());

        let err = rt.block_on(TextModelExecutor.run(&input)).err().unwrap();
        assert_eq!(err, FlowbaseError::CredentialNotFound("cred_1".to_string()));
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_credential_of_another_user_is_not_found() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let store = Arc::new(Store::mem());
        store
            .credentials()
            .create(&Credential {
                id: "cred_1".to_string(),
                user_id: "someone_else".to_string(),
                name: "openai".to_string(),
                value: "sk-test".to_string(),
                timestamp: utils::time::time_millis(),
            })
            .unwrap();

        let input = input(store, config());
        let err = rt.block_on(TextModelExecutor.run(&input)).err().unwrap();
        assert_eq!(err, FlowbaseError::CredentialNotFound("cred_1".to_string()));
    }

    #[test]
    fn test_prompt_templates_resolved_before_credential_lookup() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let store = Arc::new(Store::mem());
        let mut input = input(
            store,
            json!({
                "variable_name": "summary",
                "credential_id": "cred_1",
                "model": "gpt-4o-mini",
                "user_prompt": "Summarize {{missing.path}}"
            }),
        );
        input.context = WorkflowContext::new();

        let err = rt.block_on(TextModelExecutor.run(&input)).err().unwrap();
        assert!(matches!(err, FlowbaseError::Template(_)));
    }
}
