use crate::model::NodeId;

/// Lifecycle of a single node within a run.
///
/// Every executed node produces `Loading` followed by exactly one of
/// `Success` or `Error`; the payload is the wall-clock timestamp in
/// milliseconds.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    Loading(i64),
    Success(i64),
    Error { at: i64, reason: String },
}

impl NodeEvent {
    pub fn str(&self) -> &str {
        match self {
            NodeEvent::Loading(_) => "Loading",
            NodeEvent::Success(_) => "Success",
            NodeEvent::Error { .. } => "Error",
        }
    }
}

/// Lifecycle of the run as a whole.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Started(RunStartedEvent),
    Succeeded,
    Failed(RunFailedEvent),
}

impl RunEvent {
    pub fn str(&self) -> &str {
        match self {
            RunEvent::Started(_) => "Running",
            RunEvent::Succeeded => "Succeeded",
            RunEvent::Failed(_) => "Failed",
        }
    }
}

/// Emitted once before the first node runs.
#[derive(Debug, Clone)]
pub struct RunStartedEvent {
    /// Scheduled node ids in execution order, for batch initialization.
    pub node_ids: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct RunFailedEvent {
    pub error: String,
}

#[derive(Debug, Clone)]
pub enum StatusEvent {
    Run(RunEvent),
    Node(NodeEvent),
}

impl StatusEvent {
    pub fn is_complete(&self) -> bool {
        matches!(self, StatusEvent::Run(RunEvent::Succeeded))
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            StatusEvent::Run(RunEvent::Failed(_)) | StatusEvent::Node(NodeEvent::Error { .. })
        )
    }
}

/// One status message on the broadcast stream.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    /// Execution id (equal to the triggering event id).
    pub eid: String,
    /// Node id; empty for run-level events.
    pub nid: NodeId,
    /// Category label of the node ("trigger", "http_request", ...);
    /// empty for run-level events.
    pub category: String,
    pub event: StatusEvent,
}

impl StatusMessage {
    pub fn run(
        eid: &str,
        event: RunEvent,
    ) -> Self {
        Self {
            eid: eid.to_string(),
            nid: String::new(),
            category: String::new(),
            event: StatusEvent::Run(event),
        }
    }

    pub fn node(
        eid: &str,
        nid: &str,
        category: &str,
        event: NodeEvent,
    ) -> Self {
        Self {
            eid: eid.to_string(),
            nid: nid.to_string(),
            category: category.to_string(),
            event: StatusEvent::Node(event),
        }
    }
}
