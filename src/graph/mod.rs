//! Workflow graph construction and scheduling.
//!
//! Builds a directed graph (petgraph) from a workflow's nodes and connections
//! and flattens it into one deterministic, dependency-respecting execution
//! order. Cycles and dangling connections are configuration errors.

mod loader;
mod sort;

pub use loader::GraphLoader;
pub use sort::WorkflowGraph;
