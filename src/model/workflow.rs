use serde::{Deserialize, Serialize};

use crate::{
    FlowbaseError, Result,
    model::{ConnectionModel, NodeModel},
};

/// The named, owned graph of nodes and connections.
///
/// Owned and mutated by the surrounding editor; the engine only reads it.
/// `user_id` scopes credential lookups for the nodes that need them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub user_id: String,
    pub nodes: Vec<NodeModel>,
    #[serde(default)]
    pub connections: Vec<ConnectionModel>,
}

impl WorkflowModel {
    pub fn from_json(s: &str) -> Result<Self> {
        let workflow = serde_json::from_str::<WorkflowModel>(s);
        match workflow {
            Ok(v) => Ok(v),
            Err(e) => Err(FlowbaseError::Workflow(format!("{}", e))),
        }
    }
}
