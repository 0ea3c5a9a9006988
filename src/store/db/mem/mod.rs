mod collect;
mod r#impl;

use std::{collections::HashMap, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value as JsonValue;

use crate::{
    Result,
    store::{DbCollection, DbStore, Store, data::*},
};
pub use collect::Collect;

#[derive(Debug, Clone)]
pub struct MemStore {
    workflows: Arc<Collect<Workflow>>,
    executions: Arc<Collect<Execution>>,
    node_runs: Arc<Collect<NodeRun>>,
    steps: Arc<Collect<StepResult>>,
    credentials: Arc<Collect<Credential>>,
    events: Arc<Collect<EventRecord>>,
}

trait DbDocument: Serialize + DeserializeOwned {
    fn id(&self) -> &str;
    fn doc(&self) -> Result<HashMap<String, JsonValue>>;
}

impl DbStore for MemStore {
    fn init(
        &self,
        s: &Store,
    ) {
        s.register(self.workflows());
        s.register(self.executions());
        s.register(self.node_runs());
        s.register(self.steps());
        s.register(self.credentials());
        s.register(self.events());
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        let workflows = Collect::new("workflows");
        let executions = Collect::new("executions");
        let node_runs = Collect::new("node_runs");
        let steps = Collect::new("steps");
        let credentials = Collect::new("credentials");
        let events = Collect::new("events");

        Self {
            workflows: Arc::new(workflows),
            executions: Arc::new(executions),
            node_runs: Arc::new(node_runs),
            steps: Arc::new(steps),
            credentials: Arc::new(credentials),
            events: Arc::new(events),
        }
    }

    pub fn workflows(&self) -> Arc<dyn DbCollection<Item = Workflow> + Send + Sync> {
        self.workflows.clone()
    }

    pub fn executions(&self) -> Arc<dyn DbCollection<Item = Execution> + Send + Sync> {
        self.executions.clone()
    }

    pub fn node_runs(&self) -> Arc<dyn DbCollection<Item = NodeRun> + Send + Sync> {
        self.node_runs.clone()
    }

    pub fn steps(&self) -> Arc<dyn DbCollection<Item = StepResult> + Send + Sync> {
        self.steps.clone()
    }

    pub fn credentials(&self) -> Arc<dyn DbCollection<Item = Credential> + Send + Sync> {
        self.credentials.clone()
    }

    pub fn events(&self) -> Arc<dyn DbCollection<Item = EventRecord> + Send + Sync> {
        self.events.clone()
    }
}
