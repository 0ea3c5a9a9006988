use serde::{Deserialize, Serialize};

/// node id
pub type NodeId = String;

/// Discriminator selecting which executor runs a node.
///
/// The four trigger kinds perform no external effect during a run; they only
/// seed the initial context and exist so the editor can distinguish how a
/// workflow is started.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString, strum::EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeType {
    Initial,
    ManualTrigger,
    StripeTrigger,
    GoogleFormTrigger,
    HttpRequest,
    TextModel,
    ChatWebhook,
}

/// Node-type category used to address status events.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeCategory {
    Trigger,
    HttpRequest,
    TextModel,
    ChatWebhook,
}

impl NodeType {
    pub fn category(&self) -> NodeCategory {
        match self {
            NodeType::Initial | NodeType::ManualTrigger | NodeType::StripeTrigger | NodeType::GoogleFormTrigger => NodeCategory::Trigger,
            NodeType::HttpRequest => NodeCategory::HttpRequest,
            NodeType::TextModel => NodeCategory::TextModel,
            NodeType::ChatWebhook => NodeCategory::ChatWebhook,
        }
    }

    /// Trigger kinds only seed initial context; they never call out.
    pub fn is_trigger(&self) -> bool {
        self.category() == NodeCategory::Trigger
    }
}

/// One step in a workflow graph, as stored by the editor.
///
/// `data` is opaque to the engine; each executor validates it against its own
/// schema before doing any work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeModel {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    pub node_type: NodeType,
    #[serde(default)]
    pub data: serde_json::Value,
    /// retry policy for retriable (downstream) failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RetryConfig {
    /// retry times
    pub times: u64,
    /// retry interval in milliseconds
    pub interval: u64,
}
