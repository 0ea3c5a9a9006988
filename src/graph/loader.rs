use std::sync::Arc;

use tracing::trace;

use crate::{FlowbaseError, Result, model::WorkflowModel, store::Store};

/// Fetches a workflow's nodes and connections from storage.
///
/// Read-only from the engine's perspective; the editor owns the records.
pub struct GraphLoader {
    store: Arc<Store>,
}

impl GraphLoader {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
        }
    }

    /// Load and parse the stored definition for `workflow_id`.
    pub fn load(
        &self,
        workflow_id: &str,
    ) -> Result<WorkflowModel> {
        trace!("graph::load({})", workflow_id);

        let row = self
            .store
            .workflows()
            .find(workflow_id)
            .map_err(|_| FlowbaseError::Workflow(format!("workflow {} not found", workflow_id)))?;

        WorkflowModel::from_json(&row.data)
    }
}
