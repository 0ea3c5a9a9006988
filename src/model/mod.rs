mod connection;
mod node;
mod trigger;
mod workflow;

pub use connection::ConnectionModel;
pub use node::{NodeCategory, NodeId, NodeModel, NodeType, RetryConfig};
pub use trigger::TriggerEvent;
pub use workflow::WorkflowModel;
