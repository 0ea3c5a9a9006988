//! Error types for Flowbase.
//!
//! All errors in Flowbase are represented by the `FlowbaseError` enum. The
//! coordinator never inspects executor-specific error content; the only
//! distinction it acts on is `is_retriable()`: a configuration mistake aborts
//! the run outright, while a downstream failure may be retried per the node's
//! retry policy before it becomes fatal.

use std::{io::ErrorKind, string::FromUtf8Error};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Flowbase operations.
///
/// Each variant represents a specific category of error that can occur
/// during workflow definition, execution, or storage operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum FlowbaseError {
    /// Engine-level errors (startup, shutdown, lifecycle).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, UTF-8).
    #[error("{0}")]
    Convert(String),

    /// Workflow definition errors (missing workflow, unparsable definition).
    #[error("{0}")]
    Workflow(String),

    /// Graph construction errors (duplicate node id, dangling connection).
    #[error("{0}")]
    Graph(String),

    /// The workflow graph admits no linear execution order.
    #[error("cyclical dependencies detected: {0}")]
    CyclicGraph(String),

    /// No executor is registered for the node's declared type.
    #[error("no executor found for node type: {0}")]
    UnknownNodeType(String),

    /// A node's configuration payload is missing or invalid.
    #[error("{0}")]
    NodeConfig(String),

    /// A template reference could not be resolved against the context.
    #[error("{0}")]
    Template(String),

    /// A node tried to reuse a variable name already present in the context.
    #[error("duplicate variable name not allowed: {0}")]
    DuplicateVariable(String),

    /// A credential is missing or not owned by the run's user.
    #[error("no credential found: {0}")]
    CredentialNotFound(String),

    /// A downstream system failed (HTTP call, model provider, webhook).
    /// The only retriable category.
    #[error("{0}")]
    Downstream(String),

    /// Execution lifecycle errors.
    #[error("{0}")]
    Execution(String),

    /// Storage operation errors.
    #[error("{0}")]
    Store(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),
}

impl FlowbaseError {
    /// Whether the coordinator may retry the failed unit of work.
    ///
    /// Configuration mistakes (bad template, duplicate variable, cyclic
    /// graph, ...) are never retriable; only downstream failures are.
    pub fn is_retriable(&self) -> bool {
        matches!(self, FlowbaseError::Downstream(_))
    }
}

impl From<FlowbaseError> for String {
    fn from(val: FlowbaseError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for FlowbaseError {
    fn from(error: std::io::Error) -> Self {
        FlowbaseError::IoError(error.to_string())
    }
}

impl From<FlowbaseError> for std::io::Error {
    fn from(val: FlowbaseError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<FromUtf8Error> for FlowbaseError {
    fn from(_: FromUtf8Error) -> Self {
        FlowbaseError::Convert("Error with utf-8 string convert".to_string())
    }
}

impl From<serde_json::Error> for FlowbaseError {
    fn from(error: serde_json::Error) -> Self {
        FlowbaseError::Convert(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_downstream_is_retriable() {
        assert!(FlowbaseError::Downstream("connection reset".into()).is_retriable());

        assert!(!FlowbaseError::CyclicGraph("a -> b -> a".into()).is_retriable());
        assert!(!FlowbaseError::UnknownNodeType("carrier_pigeon".into()).is_retriable());
        assert!(!FlowbaseError::NodeConfig("no endpoint configured".into()).is_retriable());
        assert!(!FlowbaseError::Template("variable 'x' not found".into()).is_retriable());
        assert!(!FlowbaseError::DuplicateVariable("foo".into()).is_retriable());
        assert!(!FlowbaseError::CredentialNotFound("cred_1".into()).is_retriable());
        assert!(!FlowbaseError::Store("connection pool exhausted".into()).is_retriable());
    }
}
