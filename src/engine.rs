//! Workflow engine - the main entry point for Flowbase.
//!
//! The engine manages the lifecycle of workflows and runs, including:
//! - Deploying workflow definitions
//! - Triggering executions from events
//! - Managing the status channel and storage
//! - Graceful shutdown coordination

mod monitor;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::runtime::{Builder, Runtime};
use tracing::error;

use crate::{
    Config, FlowbaseError, Result, StoreType,
    common::{MemCache, Queue, Shutdown},
    coordinator::Coordinator,
    executors::ExecutorRegistry,
    model::{TriggerEvent, WorkflowModel},
    status::{Channel, RunEvent, StatusEvent, StatusSubscription, SubscribeOptions},
    store::{DbStore, MemStore, PostgresStore, Store, data},
};

use monitor::Monitor;

/// Maximum number of in-flight runs to cache in memory.
const RUN_CACHE_SIZE: usize = 2048;
/// Size of the queue for completed run notifications.
const RUN_COMPLETE_QUEUE_SIZE: usize = 100;

/// The main workflow engine.
///
/// Engine is the embedding surface of Flowbase, responsible for:
/// - Managing the tokio runtime for async execution
/// - Broadcasting status events for pub/sub observation
/// - Storing workflow definitions and execution state
/// - Launching runs in response to trigger events
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::default();
/// let engine = Engine::new_with_config(config);
/// engine.launch();
///
/// // Deploy a workflow
/// engine.deploy(&workflow_model)?;
///
/// // Trigger a run
/// let eid = engine.trigger(TriggerEvent::new("workflow_id", "evt_123"))?;
///
/// // Shutdown when done
/// engine.shutdown();
/// ```
pub struct Engine {
    /// Status channel for broadcasting run events.
    channel: Arc<Channel>,
    /// Persistent storage for workflows and executions.
    store: Arc<Store>,
    /// Background monitor for event persistence.
    monitor: Monitor,
    /// Drives runs to their terminal state.
    coordinator: Coordinator,
    /// Queue for receiving run completion notifications.
    runs_complete_queue: Arc<Queue<String>>,
    /// In-memory cache of in-flight runs.
    runs: Arc<MemCache<String, Arc<TriggerEvent>>>,

    /// Flag indicating if the engine is running.
    running: Arc<AtomicBool>,
    /// Tokio runtime for async task execution.
    runtime: Arc<Runtime>,
    /// Shutdown coordinator for graceful termination.
    shutdown: Shutdown,
}

impl Engine {
    /// Creates a new engine with the given configuration.
    pub fn new_with_config(config: Config) -> Self {
        let runtime = Arc::new(Builder::new_multi_thread().worker_threads(config.async_worker_thread_number.into()).enable_all().build().unwrap());
        Self::new(config, runtime)
    }

    pub(crate) fn new(
        config: Config,
        runtime: Arc<Runtime>,
    ) -> Self {
        let store = Store::new();
        let db: Box<dyn DbStore> = match config.store.store_type {
            StoreType::Mem => {
                let mem = MemStore::new();
                Box::new(mem)
            }
            StoreType::Postgres => {
                let postgres = PostgresStore::new(
                    &config.store.postgres.as_ref().expect("Postgres configuration is required when store type is Postgres").database_url,
                    runtime.clone(),
                );
                Box::new(postgres)
            }
        };
        db.init(&store);

        let store = Arc::new(store);
        let channel = Arc::new(Channel::new(runtime.clone()));
        let shutdown = Shutdown::new();
        let monitor = Monitor::new(store.clone(), channel.clone(), runtime.clone(), shutdown.clone());

        let registry = ExecutorRegistry::new(config.http_request_timeout_ms);
        let coordinator = Coordinator::new(store.clone(), channel.clone(), registry);

        let runs_complete_queue = Queue::new(RUN_COMPLETE_QUEUE_SIZE);

        Self {
            channel,
            store,
            monitor,
            coordinator,
            runs_complete_queue,
            runs: Arc::new(MemCache::new(RUN_CACHE_SIZE)),
            running: Arc::new(AtomicBool::new(false)),
            runtime,
            shutdown,
        }
    }

    /// Starts the engine and begins processing events.
    ///
    /// This method:
    /// - Starts the event monitor for persistence
    /// - Begins listening on the status channel
    /// - Spawns a background task to clean up finished runs
    ///
    /// The engine is single-use: launching again after [`Engine::shutdown`]
    /// has no effect, build a new engine instead.
    pub fn launch(&self) {
        // The shutdown latch stays tripped once shutdown has run, so a
        // relaunched engine would accept triggers without dispatching them.
        if self.shutdown.is_terminated() || self.running.swap(true, Ordering::Relaxed) {
            return;
        }

        // Register handlers first, then start listening
        // This ensures no events are missed
        self.monitor.monitor();

        // both terminal run events release the run cache slot
        let runs_complete_queue = self.runs_complete_queue.clone();
        StatusSubscription::channel(self.channel.clone(), SubscribeOptions::default()).on_event(move |e| {
            if let StatusEvent::Run(RunEvent::Succeeded | RunEvent::Failed(_)) = &e.event {
                let _ = runs_complete_queue.send(e.eid.clone());
            }
        });

        self.channel.listen();

        let runs_complete_queue = self.runs_complete_queue.clone();
        let shutdown = self.shutdown.clone();
        let runs = self.runs.clone();
        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    Some(eid) = runs_complete_queue.next_async() => {
                        runs.remove(&eid);
                    }
                }
            }
        });
    }

    /// Gracefully shuts down the engine.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }

        self.shutdown.shutdown();
        self.channel.shutdown();
    }

    /// Deploys a workflow definition to the store.
    pub fn deploy(
        &self,
        workflow: &WorkflowModel,
    ) -> Result<bool> {
        self.store.deploy(workflow)
    }

    /// Launches a run for the given trigger event and returns its
    /// execution id (equal to the event id).
    pub fn trigger(
        &self,
        event: TriggerEvent,
    ) -> Result<String> {
        if !self.running.load(Ordering::Relaxed) {
            return Err(FlowbaseError::Engine("Engine is not running".to_string()));
        }

        let eid = event.event_id.clone();
        let event = Arc::new(event);
        self.runs.set(eid.clone(), event.clone());

        let coordinator = self.coordinator.clone();
        self.runtime.spawn(async move {
            if let Err(err) = coordinator.run(&event).await {
                error!("execution {} failed: {}", event.event_id, err);
            }
        });

        Ok(eid)
    }

    /// Looks up the durable record of an execution.
    pub fn execution(
        &self,
        eid: &str,
    ) -> Result<data::Execution> {
        self.store.executions().find(eid)
    }

    /// Subscribes to status events, filtered by the given glob options.
    pub fn subscribe(
        &self,
        options: SubscribeOptions,
    ) -> StatusSubscription {
        StatusSubscription::channel(self.channel.clone(), options)
    }

    /// Returns a reference to the status channel.
    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::model::{ConnectionModel, NodeModel, NodeType};

    fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..100 {
            if cond() {
                return;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        panic!("condition not met in time");
    }

    fn trigger_workflow() -> WorkflowModel {
        WorkflowModel {
            id: "w1".to_string(),
            name: "smoke".to_string(),
            user_id: "u1".to_string(),
            nodes: vec![
                NodeModel {
                    id: "t1".to_string(),
                    name: "start".to_string(),
                    node_type: NodeType::ManualTrigger,
                    data: json!({}),
                    retry: None,
                },
                NodeModel {
                    id: "t2".to_string(),
                    name: "followup".to_string(),
                    node_type: NodeType::Initial,
                    data: json!({}),
                    retry: None,
                },
            ],
            connections: vec![ConnectionModel {
                id: "c1".to_string(),
                from_node_id: "t1".to_string(),
                to_node_id: "t2".to_string(),
            }],
        }
    }

    #[test]
    fn test_engine_runs_a_workflow_end_to_end() {
        let engine = Engine::new_with_config(Config::default());
        engine.launch();

        engine.deploy(&trigger_workflow()).unwrap();
        let eid = engine.trigger(TriggerEvent::new("w1", "evt_1")).unwrap();
        assert_eq!(eid, "evt_1");

        wait_for(|| engine.execution("evt_1").map(|e| e.state == "Success").unwrap_or(false));

        // monitor persisted the per-node history
        wait_for(|| engine.store.node_runs().find("evt_1-t1").map(|n| n.status == "Success").unwrap_or(false));
        wait_for(|| engine.store.node_runs().find("evt_1-t2").map(|n| n.status == "Success").unwrap_or(false));

        engine.shutdown();
    }

    #[test]
    fn test_relaunch_after_shutdown_is_rejected() {
        let engine = Engine::new_with_config(Config::default());
        engine.launch();
        engine.shutdown();

        engine.launch();
        let err = engine.trigger(TriggerEvent::new("w1", "evt_1")).err().unwrap();
        assert!(matches!(err, FlowbaseError::Engine(_)));
    }

    #[test]
    fn test_trigger_requires_running_engine() {
        let engine = Engine::new_with_config(Config::default());
        let err = engine.trigger(TriggerEvent::new("w1", "evt_1")).err().unwrap();
        assert!(matches!(err, FlowbaseError::Engine(_)));
    }
}
