//! Per-run execution state.
//!
//! [`WorkflowContext`] is the append-only variable namespace threaded through
//! the nodes of one run; [`StepRecorder`] gives executors at-most-once
//! semantics for their external side effects.

mod context;
mod step;

pub use context::WorkflowContext;
pub use step::StepRecorder;
