use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use crate::{
    FlowbaseError, Result,
    executors::{Executor, ExecutorInput, parse_config, template},
    model::NodeCategory,
    runtime::WorkflowContext,
};

const STEP_LABEL: &str = "http-request";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct HttpRequestConfig {
    variable_name: String,
    endpoint: String,
    method: HttpMethod,
    body: Option<String>,
    // request timeout in milliseconds; falls back to the engine default
    timeout: Option<u64>,
}

/// Calls an HTTP endpoint and stores the response under the configured
/// variable name as `{ "httpResponse": { data, status, statusText } }`.
pub struct HttpRequestExecutor {
    default_timeout_ms: u64,
}

impl HttpRequestExecutor {
    pub fn new(default_timeout_ms: u64) -> Self {
        Self {
            default_timeout_ms,
        }
    }
}

#[async_trait]
impl Executor for HttpRequestExecutor {
    fn category(&self) -> NodeCategory {
        NodeCategory::HttpRequest
    }

    fn schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "required": ["variable_name", "endpoint", "method"],
            "properties": {
                "variable_name": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Context variable the response is stored under, supports template variables"
                },
                "endpoint": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Request URL, supports template variables like {{variable.path}}"
                },
                "method": {
                    "type": "string",
                    "enum": ["GET", "POST", "PUT", "PATCH", "DELETE"]
                },
                "body": {
                    "type": ["string", "null"],
                    "description": "Request body; must resolve to valid JSON, supports template variables"
                },
                "timeout": {
                    "type": ["integer", "null"],
                    "minimum": 0,
                    "description": "Request timeout in milliseconds"
                }
            }
        })
    }

    async fn run(
        &self,
        input: &ExecutorInput,
    ) -> Result<WorkflowContext> {
        let config = parse_config::<HttpRequestConfig>(&self.schema(), &input.node.data)?;
        let ctx = &input.context;

        // Resolve the name first so templated names hit the duplicate guard
        // with their final value, before any external call.
        let variable_name = template::resolve_template(ctx, &config.variable_name)?;
        if ctx.contains(&variable_name) {
            return Err(FlowbaseError::DuplicateVariable(variable_name));
        }

        let endpoint = template::resolve_template(ctx, &config.endpoint)?;
        let body = match &config.body {
            Some(raw) => {
                let resolved = template::resolve_template(ctx, raw)?;
                let value = serde_json::from_str::<JsonValue>(&resolved)
                    .map_err(|err| FlowbaseError::NodeConfig(format!("body is not valid json: {}", err)))?;
                Some(value)
            }
            None => None,
        };

        let timeout = Duration::from_millis(config.timeout.unwrap_or(self.default_timeout_ms));
        let method = config.method;

        let response = input
            .steps
            .run_once(&input.node.id, STEP_LABEL, || async move {
                let client = reqwest::Client::new();
                let mut request = client
                    .request(
                        method.as_ref().parse().map_err(|_| FlowbaseError::NodeConfig(format!("invalid method '{:?}'", method)))?,
                        &endpoint,
                    )
                    .timeout(timeout);

                if let Some(body) = body {
                    request = request.json(&body);
                }

                let res = request.send().await.map_err(|err| FlowbaseError::Downstream(format!("http error: {}", err)))?;

                let status = res.status();
                let status_text = status.canonical_reason().unwrap_or("").to_string();
                if !status.is_success() {
                    return Err(FlowbaseError::Downstream(format!(
                        "request failed with status {}: {}",
                        status.as_u16(),
                        status_text
                    )));
                }

                let text = res.text().await.map_err(|err| FlowbaseError::Downstream(err.to_string()))?;
                let data = serde_json::from_str::<JsonValue>(&text).unwrap_or(JsonValue::String(text));

                Ok(json!({
                    "data": data,
                    "status": status.as_u16(),
                    "statusText": status_text,
                }))
            })
            .await?;

        ctx.insert(&variable_name, json!({ "httpResponse": response }))
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
        store::Store,
    };

    fn input(data: JsonValue) -> ExecutorInput {
        let store = Arc::new(Store::mem());
        ExecutorInput {
            eid: "evt_1".to_string(),
            node: NodeModel {
                id: "n1".to_string(),
                name: "http".to_string(),
                node_type: NodeType::HttpRequest,
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

    #[test]
    fn test_success_captures_status_and_body() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let executor = HttpRequestExecutor::new(30000);

        rt.block_on(async {
            let addr = stub_http::serve_once(stub_http::response("200 OK", "application/json", r#"{"title":"delectus"}"#)).await;
            let input = input(json!({
                "variable_name": "out",
                "endpoint": format!("http://{}/todos/1", addr),
                "method": "GET"
            }));

            let ctx = executor.run(&input).await.unwrap();
            assert_eq!(
                ctx.lookup_path("out.httpResponse"),
                Some(&json!({ "data": { "title": "delectus" }, "status": 200, "statusText": "OK" }))
            );
        });
    }

    #[test]
    fn test_non_json_body_stored_as_string() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let executor = HttpRequestExecutor::new(30000);

        rt.block_on(async {
            let addr = stub_http::serve_once(stub_http::response("200 OK", "text/plain", "pong")).await;
            let input = input(json!({
                "variable_name": "out",
                "endpoint": format!("http://{}/ping", addr),
                "method": "GET"
            }));

            let ctx = executor.run(&input).await.unwrap();
            assert_eq!(ctx.lookup_path("out.httpResponse.data"), Some(&json!("pong")));
            assert_eq!(ctx.lookup_path("out.httpResponse.status"), Some(&json!(200)));
        });
    }

    #[test]
    fn test_error_status_is_downstream_error() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let executor = HttpRequestExecutor::new(30000);

        rt.block_on(async {
            let addr = stub_http::serve_once(stub_http::response("503 Service Unavailable", "text/plain", "")).await;
            let input = input(json!({
                "variable_name": "out",
                "endpoint": format!("http://{}/down", addr),
                "method": "GET"
            }));

            let err = executor.run(&input).await.err().unwrap();
            assert!(matches!(err, FlowbaseError::Downstream(_)));
            assert!(err.is_retriable());
            assert!(err.to_string().contains("503"));
        });
    }

    #[test]
    fn test_missing_config_is_node_config_error() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let executor = HttpRequestExecutor::new(30000);

        let input = input(json!({ "variable_name": "out" }));
        let err = rt.block_on(executor.run(&input)).err().unwrap();
        assert!(matches!(err, FlowbaseError::NodeConfig(_)));
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_unresolved_endpoint_template_is_fatal() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let executor = HttpRequestExecutor::new(30000);

        let input = input(json!({
            "variable_name": "out",
            "endpoint": "https://example.com/{{missing.id}}",
            "method": "GET"
        }));
        let err = rt.block_on(executor.run(&input)).err().unwrap();
        assert!(matches!(err, FlowbaseError::Template(_)));
    }

    #[test]
    fn test_duplicate_variable_checked_before_any_call() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let executor = HttpRequestExecutor::new(30000);

        let mut input = input(json!({
            "variable_name": "out",
            "endpoint": "https://example.com",
            "method": "GET"
        }));
        input.context = WorkflowContext::new().insert("out", json!(1)).unwrap();

        let err = rt.block_on(executor.run(&input)).err().unwrap();
        assert_eq!(err, FlowbaseError::DuplicateVariable("out".to_string()));
    }

    #[test]
    fn test_invalid_body_json_is_fatal() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let executor = HttpRequestExecutor::new(30000);

        let input = input(json!({
            "variable_name": "out",
            "endpoint": "https://example.com",
            "method": "POST",
            "body": "not json at all"
        }));
        let err = rt.block_on(executor.run(&input)).err().unwrap();
        assert!(matches!(err, FlowbaseError::NodeConfig(_)));
    }
}
