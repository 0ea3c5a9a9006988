use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::store::{DbCollection, DbStore, Store, data::*};

use super::{DbInit, collection::*, synclient::SynClient};

pub struct PostgresStore {
    workflows: Arc<WorkflowCollection>,
    executions: Arc<ExecutionCollection>,
    node_runs: Arc<NodeRunCollection>,
    steps: Arc<StepCollection>,
    credentials: Arc<CredentialCollection>,
    events: Arc<EventCollection>,
}

impl DbStore for PostgresStore {
    fn init(
        &self,
        s: &Store,
    ) {
        self.workflows.init();
        self.executions.init();
        self.node_runs.init();
        self.steps.init();
        self.credentials.init();
        self.events.init();

        s.register(self.workflows());
        s.register(self.executions());
        s.register(self.node_runs());
        s.register(self.steps());
        s.register(self.credentials());
        s.register(self.events());
    }
}

impl PostgresStore {
    pub fn new(
        db_url: &str,
        runtime: Arc<Runtime>,
    ) -> Self {
        let conn = Arc::new(SynClient::connect(db_url, runtime));
        let workflows = WorkflowCollection::new(&conn);
        let executions = ExecutionCollection::new(&conn);
        let node_runs = NodeRunCollection::new(&conn);
        let steps = StepCollection::new(&conn);
        let credentials = CredentialCollection::new(&conn);
        let events = EventCollection::new(&conn);

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
