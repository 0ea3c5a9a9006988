mod credential;
mod event;
mod execution;
mod node_run;
mod step;
mod workflow;

pub use credential::Credential;
pub use event::EventRecord;
pub use execution::{Execution, ExecutionState};
pub use node_run::NodeRun;
pub use step::StepResult;
pub use workflow::Workflow;
