//! Drives one execution from trigger to terminal state.
//!
//! The coordinator owns the run's state machine: it creates the durable
//! execution record (idempotently, keyed by the triggering event id), walks
//! the sorted nodes strictly in order, retries retriable failures per node
//! policy, and records exactly one terminal Success or Failed transition.

use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info};

use crate::{
    FlowbaseError, Result,
    executors::{ExecutorInput, ExecutorRegistry},
    graph::{GraphLoader, WorkflowGraph},
    model::{TriggerEvent, WorkflowModel},
    runtime::{StepRecorder, WorkflowContext},
    status::{RunEvent, RunFailedEvent, RunStartedEvent, StatusMessage, StatusPublisher},
    store::{
        Store,
        data::{Execution, ExecutionState},
    },
    utils,
};

#[derive(Clone)]
pub struct Coordinator {
    store: Arc<Store>,
    publisher: Arc<dyn StatusPublisher>,
    registry: ExecutorRegistry,
}

impl Coordinator {
    pub fn new(
        store: Arc<Store>,
        publisher: Arc<dyn StatusPublisher>,
        registry: ExecutorRegistry,
    ) -> Self {
        Self {
            store,
            publisher,
            registry,
        }
    }

    /// Run the workflow named by `event` to a terminal state.
    ///
    /// Re-delivering an event whose execution already finished is a no-op;
    /// re-delivering one still marked Running resumes it, with completed
    /// durable steps replayed from the store.
    pub async fn run(
        &self,
        event: &TriggerEvent,
    ) -> Result<()> {
        let eid = &event.event_id;
        info!("coordinator::run(wid={}, eid={})", event.workflow_id, eid);

        if !self.ensure_execution(event)? {
            debug!("execution {} already finished, skipping", eid);
            return Ok(());
        }

        let model = match self.prepare(event) {
            Ok(v) => v,
            Err(err) => {
                self.fail(eid, &err);
                return Err(err);
            }
        };
        let (model, sorted) = model;

        let mut ctx = match &event.initial_data {
            Some(vars) => WorkflowContext::from(vars.clone()),
            None => WorkflowContext::new(),
        };

        self.publisher.publish(StatusMessage::run(
            eid,
            RunEvent::Started(RunStartedEvent {
                node_ids: sorted.iter().map(|n| n.id.clone()).collect(),
            }),
        ));

        let steps = StepRecorder::new(eid, self.store.clone());
        for node in sorted {
            let executor = match self.registry.resolve(node.node_type) {
                Ok(v) => v,
                Err(err) => {
                    self.fail(eid, &err);
                    return Err(err);
                }
            };

            let input = ExecutorInput {
                eid: eid.clone(),
                node: node.clone(),
                user_id: model.user_id.clone(),
                context: ctx.clone(),
                publisher: self.publisher.clone(),
                steps: steps.clone(),
                store: self.store.clone(),
            };

            let mut retry_times = node.retry.as_ref().map(|r| r.times).unwrap_or(0);
            let retry_interval = node.retry.as_ref().map(|r| r.interval).unwrap_or(0);

            ctx = loop {
                match executor.execute(&input).await {
                    Ok(next) => break next,
                    Err(err) if err.is_retriable() && retry_times > 0 => {
                        retry_times -= 1;
                        debug!("node {} failed with retriable error, {} retries left: {}", node.id, retry_times, err);
                        if retry_interval > 0 {
                            tokio::time::sleep(Duration::from_millis(retry_interval)).await;
                        }
                    }
                    Err(err) => {
                        self.fail(eid, &err);
                        return Err(err);
                    }
                }
            };
        }

        self.succeed(eid, &ctx);
        Ok(())
    }

    /// Create the execution record if this event has not been seen.
    /// Returns false when the execution already reached a terminal state.
    fn ensure_execution(
        &self,
        event: &TriggerEvent,
    ) -> Result<bool> {
        let executions = self.store.executions();
        let eid = &event.event_id;

        if !executions.exists(eid)? {
            let now = utils::time::time_millis();
            let record = Execution {
                id: eid.clone(),
                wid: event.workflow_id.clone(),
                state: ExecutionState::Running.as_ref().to_string(),
                output: None,
                err: None,
                err_detail: None,
                start_time: now,
                end_time: 0,
                timestamp: now,
            };
            if let Err(err) = executions.create(&record) {
                // Lost the create race to a concurrent delivery of the same
                // event; that is fine as long as the record is there.
                if !executions.exists(eid)? {
                    return Err(err);
                }
            }
        }

        let record = executions.find(eid)?;
        Ok(record.state == ExecutionState::Running.as_ref())
    }

    fn prepare(
        &self,
        event: &TriggerEvent,
    ) -> Result<(WorkflowModel, Vec<crate::model::NodeModel>)> {
        let loader = GraphLoader::new(self.store.clone());
        let model = loader.load(&event.workflow_id)?;
        let graph = WorkflowGraph::try_from(&model)?;
        let sorted = graph.sorted_nodes()?;
        Ok((model, sorted))
    }

    fn succeed(
        &self,
        eid: &str,
        ctx: &WorkflowContext,
    ) {
        let output = match serde_json::to_string(&crate::Vars::from(ctx)) {
            Ok(v) => Some(v),
            Err(err) => {
                error!("failed to serialize output of execution {}: {}", eid, err);
                None
            }
        };
        let executions = self.store.executions();
        let updated = executions.find(eid).and_then(|mut record| {
            record.state = ExecutionState::Success.as_ref().to_string();
            record.output = output;
            record.end_time = utils::time::time_millis();
            executions.update(&record)
        });
        if let Err(err) = updated {
            error!("failed to record success of execution {}: {}", eid, err);
        }

        self.publisher.publish(StatusMessage::run(eid, RunEvent::Succeeded));
    }

    /// Last line of the failure path; storage faults here are logged, never
    /// propagated.
    fn fail(
        &self,
        eid: &str,
        cause: &FlowbaseError,
    ) {
        info!("execution {} failed: {}", eid, cause);

        let executions = self.store.executions();
        let updated = executions.find(eid).and_then(|mut record| {
            record.state = ExecutionState::Failed.as_ref().to_string();
            record.err = Some(cause.to_string());
            record.err_detail = Some(format!("{:?}", cause));
            record.end_time = utils::time::time_millis();
            executions.update(&record)
        });
        if let Err(err) = updated {
            error!("failed to record failure of execution {}: {}", eid, err);
        }

        self.publisher.publish(StatusMessage::run(
            eid,
            RunEvent::Failed(RunFailedEvent {
                error: cause.to_string(),
            }),
        ));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    };

    use async_trait::async_trait;
    use serde_json::{Value as JsonValue, json};

    use super::*;
    use crate::{
        Vars,
        executors::{Executor, stub_http},
        model::{ConnectionModel, NodeCategory, NodeModel, NodeType},
        status::{NodeEvent, StatusEvent},
    };

    /// Captures every published message in order.
    #[derive(Default)]
    struct CapturePublisher {
        messages: Mutex<Vec<StatusMessage>>,
    }

    impl StatusPublisher for CapturePublisher {
        fn publish(
            &self,
            message: StatusMessage,
        ) {
            self.messages.lock().unwrap().push(message);
        }
    }

    impl CapturePublisher {
        fn messages(&self) -> Vec<StatusMessage> {
            self.messages.lock().unwrap().clone()
        }
    }

    /// Test executor that inserts `{"ok": true}` under the node's
    /// `variable_name`, optionally failing a few times first.
    struct CannedExecutor {
        fails_before_success: AtomicU64,
    }

    impl CannedExecutor {
        fn new() -> Self {
            Self {
                fails_before_success: AtomicU64::new(0),
            }
        }

        fn failing(times: u64) -> Self {
            Self {
                fails_before_success: AtomicU64::new(times),
            }
        }
    }

    #[async_trait]
    impl Executor for CannedExecutor {
        fn category(&self) -> NodeCategory {
            NodeCategory::HttpRequest
        }

        fn schema(&self) -> JsonValue {
            json!({ "type": "object", "required": ["variable_name"] })
        }

        async fn run(
            &self,
            input: &ExecutorInput,
        ) -> Result<WorkflowContext> {
            if self.fails_before_success.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1)).is_ok() {
                return Err(FlowbaseError::Downstream("503".to_string()));
            }
            let name = input.node.data["variable_name"].as_str().unwrap().to_string();
            input.context.insert(&name, json!({ "ok": true }))
        }
    }

    fn node(
        id: &str,
        node_type: NodeType,
        data: JsonValue,
    ) -> NodeModel {
        NodeModel {
            id: id.to_string(),
            name: id.to_string(),
            node_type,
            data,
            retry: None,
        }
    }

    fn conn(
        from: &str,
        to: &str,
    ) -> ConnectionModel {
        ConnectionModel {
            id: format!("{}-{}", from, to),
            from_node_id: from.to_string(),
            to_node_id: to.to_string(),
        }
    }

    struct Fixture {
        store: Arc<Store>,
        publisher: Arc<CapturePublisher>,
        coordinator: Coordinator,
        rt: tokio::runtime::Runtime,
    }

    fn fixture(registry: ExecutorRegistry) -> Fixture {
        let store = Arc::new(Store::mem());
        let publisher = Arc::new(CapturePublisher::default());
        let coordinator = Coordinator::new(store.clone(), publisher.clone(), registry);
        Fixture {
            store,
            publisher,
            coordinator,
            rt: tokio::runtime::Runtime::new().unwrap(),
        }
    }

    fn deploy(
        store: &Store,
        nodes: Vec<NodeModel>,
        connections: Vec<ConnectionModel>,
    ) {
        let model = WorkflowModel {
            id: "w1".to_string(),
            name: "w1".to_string(),
            user_id: "u1".to_string(),
            nodes,
            connections,
        };
        store.deploy(&model).unwrap();
    }

    fn canned_registry() -> ExecutorRegistry {
        let mut registry = ExecutorRegistry::default();
        registry.register(NodeType::HttpRequest, Arc::new(CannedExecutor::new()));
        registry
    }

    fn node_events(messages: &[StatusMessage]) -> Vec<(String, String)> {
        messages
            .iter()
            .filter_map(|m| match &m.event {
                StatusEvent::Node(e) => Some((m.nid.clone(), e.str().to_string())),
                StatusEvent::Run(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_full_run_success() {
        let f = fixture(canned_registry());
        deploy(
            &f.store,
            vec![
                node("t1", NodeType::ManualTrigger, json!({})),
                node("h1", NodeType::HttpRequest, json!({ "variable_name": "first" })),
                node("h2", NodeType::HttpRequest, json!({ "variable_name": "second" })),
            ],
            vec![conn("t1", "h1"), conn("h1", "h2")],
        );

        let event = TriggerEvent::new("w1", "evt_1");
        f.rt.block_on(f.coordinator.run(&event)).unwrap();

        let record = f.store.executions().find("evt_1").unwrap();
        assert_eq!(record.state, "Success");
        assert!(record.end_time > 0);

        let output: Vars = serde_json::from_str(&record.output.unwrap()).unwrap();
        assert_eq!(output.get::<JsonValue>("first"), Some(json!({ "ok": true })));
        assert_eq!(output.get::<JsonValue>("second"), Some(json!({ "ok": true })));

        // loading strictly precedes the terminal event, per node, in order
        let events = node_events(&f.publisher.messages());
        assert_eq!(
            events,
            [
                ("t1".to_string(), "Loading".to_string()),
                ("t1".to_string(), "Success".to_string()),
                ("h1".to_string(), "Loading".to_string()),
                ("h1".to_string(), "Success".to_string()),
                ("h2".to_string(), "Loading".to_string()),
                ("h2".to_string(), "Success".to_string()),
            ]
        );

        let run_events: Vec<String> = f
            .publisher
            .messages()
            .iter()
            .filter_map(|m| match &m.event {
                StatusEvent::Run(e) => Some(e.str().to_string()),
                StatusEvent::Node(_) => None,
            })
            .collect();
        assert_eq!(run_events, ["Running", "Succeeded"]);
    }

    #[test]
    fn test_http_workflow_captures_response() {
        // the stock registry, no canned executors
        let f = fixture(ExecutorRegistry::new(5000));
        let addr = f.rt.block_on(stub_http::serve_once(stub_http::response("200 OK", "application/json", r#"{"id":1}"#)));
        deploy(
            &f.store,
            vec![
                node("t1", NodeType::ManualTrigger, json!({})),
                node(
                    "h1",
                    NodeType::HttpRequest,
                    json!({
                        "variable_name": "todo",
                        "endpoint": format!("http://{}/todos/1", addr),
                        "method": "GET"
                    }),
                ),
            ],
            vec![conn("t1", "h1")],
        );

        let event = TriggerEvent::new("w1", "evt_1");
        f.rt.block_on(f.coordinator.run(&event)).unwrap();

        let record = f.store.executions().find("evt_1").unwrap();
        assert_eq!(record.state, "Success");

        let output: Vars = serde_json::from_str(&record.output.unwrap()).unwrap();
        assert_eq!(
            output.get::<JsonValue>("todo"),
            Some(json!({ "httpResponse": { "data": { "id": 1 }, "status": 200, "statusText": "OK" } }))
        );
    }

    #[test]
    fn test_initial_data_seeds_context() {
        let f = fixture(canned_registry());
        deploy(&f.store, vec![node("t1", NodeType::ManualTrigger, json!({}))], vec![]);

        let mut vars = Vars::new();
        vars.set("seed", json!("value"));
        let event = TriggerEvent::new("w1", "evt_1").with_initial_data(vars);
        f.rt.block_on(f.coordinator.run(&event)).unwrap();

        let record = f.store.executions().find("evt_1").unwrap();
        let output: Vars = serde_json::from_str(&record.output.unwrap()).unwrap();
        assert_eq!(output.get::<String>("seed"), Some("value".to_string()));
    }

    #[test]
    fn test_unconnected_nodes_run_in_stored_order() {
        let f = fixture(canned_registry());
        deploy(
            &f.store,
            vec![
                node("b", NodeType::HttpRequest, json!({ "variable_name": "vb" })),
                node("a", NodeType::HttpRequest, json!({ "variable_name": "va" })),
            ],
            vec![],
        );

        let event = TriggerEvent::new("w1", "evt_1");
        f.rt.block_on(f.coordinator.run(&event)).unwrap();

        let order: Vec<String> = node_events(&f.publisher.messages()).iter().map(|(nid, _)| nid.clone()).collect();
        assert_eq!(order, ["b", "b", "a", "a"]);
    }

    #[test]
    fn test_node_failure_is_fail_fast() {
        let mut registry = ExecutorRegistry::default();
        registry.register(NodeType::HttpRequest, Arc::new(CannedExecutor::new()));
        let f = fixture(registry);

        // h2 references a context variable no node provides
        deploy(
            &f.store,
            vec![
                node("h1", NodeType::HttpRequest, json!({ "variable_name": "first" })),
                node(
                    "c1",
                    NodeType::ChatWebhook,
                    json!({
                        "variable_name": "sent",
                        "webhook_url": "https://example.com/hook",
                        "content": "{{missing.title}}"
                    }),
                ),
                node("h2", NodeType::HttpRequest, json!({ "variable_name": "second" })),
            ],
            vec![conn("h1", "c1"), conn("c1", "h2")],
        );

        let event = TriggerEvent::new("w1", "evt_1");
        let err = f.rt.block_on(f.coordinator.run(&event)).err().unwrap();
        assert!(matches!(err, FlowbaseError::Template(_)));

        let record = f.store.executions().find("evt_1").unwrap();
        assert_eq!(record.state, "Failed");
        assert!(record.err.unwrap().contains("missing"));
        assert!(record.err_detail.is_some());

        // h2 never attempted
        let events = node_events(&f.publisher.messages());
        assert!(!events.iter().any(|(nid, _)| nid == "h2"));
        assert_eq!(events.last().unwrap(), &("c1".to_string(), "Error".to_string()));
    }

    #[test]
    fn test_cycle_fails_without_node_events() {
        let f = fixture(canned_registry());
        deploy(
            &f.store,
            vec![
                node("a", NodeType::HttpRequest, json!({ "variable_name": "va" })),
                node("b", NodeType::HttpRequest, json!({ "variable_name": "vb" })),
            ],
            vec![conn("a", "b"), conn("b", "a")],
        );

        let event = TriggerEvent::new("w1", "evt_1");
        let err = f.rt.block_on(f.coordinator.run(&event)).err().unwrap();
        assert!(matches!(err, FlowbaseError::CyclicGraph(_)));

        let record = f.store.executions().find("evt_1").unwrap();
        assert_eq!(record.state, "Failed");

        assert!(node_events(&f.publisher.messages()).is_empty());
    }

    #[test]
    fn test_unknown_workflow_fails_the_execution() {
        let f = fixture(canned_registry());

        let event = TriggerEvent::new("nope", "evt_1");
        let err = f.rt.block_on(f.coordinator.run(&event)).err().unwrap();
        assert!(matches!(err, FlowbaseError::Workflow(_)));
        assert_eq!(f.store.executions().find("evt_1").unwrap().state, "Failed");
    }

    #[test]
    fn test_redelivery_of_finished_event_is_noop() {
        let f = fixture(canned_registry());
        deploy(&f.store, vec![node("h1", NodeType::HttpRequest, json!({ "variable_name": "v" }))], vec![]);

        let event = TriggerEvent::new("w1", "evt_1");
        f.rt.block_on(f.coordinator.run(&event)).unwrap();
        let first = f.store.executions().find("evt_1").unwrap();
        let events_after_first = f.publisher.messages().len();

        f.rt.block_on(f.coordinator.run(&event)).unwrap();
        let second = f.store.executions().find("evt_1").unwrap();

        assert_eq!(second.start_time, first.start_time);
        assert_eq!(second.end_time, first.end_time);
        assert_eq!(f.publisher.messages().len(), events_after_first);
    }

    #[test]
    fn test_duplicate_variable_name_fails_the_run() {
        let f = fixture(canned_registry());
        deploy(
            &f.store,
            vec![
                node("h1", NodeType::HttpRequest, json!({ "variable_name": "same" })),
                node("h2", NodeType::HttpRequest, json!({ "variable_name": "same" })),
            ],
            vec![conn("h1", "h2")],
        );

        let event = TriggerEvent::new("w1", "evt_1");
        let err = f.rt.block_on(f.coordinator.run(&event)).err().unwrap();
        assert_eq!(err, FlowbaseError::DuplicateVariable("same".to_string()));
        assert_eq!(f.store.executions().find("evt_1").unwrap().state, "Failed");
    }

    #[test]
    fn test_retriable_failure_retried_until_success() {
        let mut registry = ExecutorRegistry::default();
        registry.register(NodeType::HttpRequest, Arc::new(CannedExecutor::failing(2)));
        let f = fixture(registry);

        let mut retried = node("h1", NodeType::HttpRequest, json!({ "variable_name": "v" }));
        retried.retry = Some(crate::model::RetryConfig {
            times: 3,
            interval: 0,
        });
        deploy(&f.store, vec![retried], vec![]);

        let event = TriggerEvent::new("w1", "evt_1");
        f.rt.block_on(f.coordinator.run(&event)).unwrap();

        assert_eq!(f.store.executions().find("evt_1").unwrap().state, "Success");

        // two error attempts, then the successful one
        let events = node_events(&f.publisher.messages());
        assert_eq!(events.iter().filter(|(_, e)| e == "Error").count(), 2);
        assert_eq!(events.last().unwrap(), &("h1".to_string(), "Success".to_string()));
    }

    #[test]
    fn test_retries_exhausted_fails_the_run() {
        let mut registry = ExecutorRegistry::default();
        registry.register(NodeType::HttpRequest, Arc::new(CannedExecutor::failing(5)));
        let f = fixture(registry);

        let mut retried = node("h1", NodeType::HttpRequest, json!({ "variable_name": "v" }));
        retried.retry = Some(crate::model::RetryConfig {
            times: 1,
            interval: 0,
        });
        deploy(&f.store, vec![retried], vec![]);

        let event = TriggerEvent::new("w1", "evt_1");
        let err = f.rt.block_on(f.coordinator.run(&event)).err().unwrap();
        assert!(err.is_retriable());
        assert_eq!(f.store.executions().find("evt_1").unwrap().state, "Failed");
    }
}
