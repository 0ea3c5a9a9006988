use serde::{Deserialize, Serialize};

use crate::model::NodeId;

/// A directed "must run before" edge between two nodes of one workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionModel {
    pub id: String,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
}
