//! # Flowbase
//!
//! Flowbase is a durable, node-based workflow execution engine written in Rust.
//! It is designed to be embedded in applications that let users compose a
//! directed graph of typed steps (triggers, HTTP calls, AI-model calls,
//! chat-webhook posts) and execute that graph on demand.
//!
//! ## Core Features
//!
//! - **Deterministic Scheduling**: every run executes the graph in one
//!   reproducible, dependency-respecting order
//! - **Durable Executions**: one persistent record per triggering event, with
//!   idempotent creation and at-most-once external side effects
//! - **Live Status**: per-node lifecycle events broadcast to any number of
//!   observers, decoupled from persistence
//! - **Pluggable Storage**: in-memory storage (testing) and PostgreSQL
//!   (production)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flowbase::{EngineBuilder, TriggerEvent, WorkflowModel};
//!
//! let engine = EngineBuilder::new().build()?;
//! engine.launch();
//!
//! let workflow = WorkflowModel::from_json(json_str)?;
//! engine.deploy(&workflow)?;
//!
//! let eid = engine.trigger(TriggerEvent::new(&workflow.id, "evt_123"))?;
//! ```

mod builder;
mod common;
mod config;
mod coordinator;
mod engine;
mod error;
mod executors;
mod graph;
mod model;
mod runtime;
mod status;
mod store;
mod utils;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use common::Vars;
pub use config::{Config, PostgresConfig, StoreConfig, StoreType};
pub use coordinator::Coordinator;
pub use engine::Engine;
pub use error::FlowbaseError;
pub use executors::{Executor, ExecutorInput, ExecutorRegistry};
pub use model::*;
pub use runtime::WorkflowContext;
pub use status::{
    Channel, NodeEvent, NoopPublisher, RunEvent, RunFailedEvent, RunStartedEvent, StatusEvent, StatusMessage, StatusPublisher, StatusSubscription,
    SubscribeOptions,
};

/// Result type alias for Flowbase operations.
pub type Result<T> = std::result::Result<T, FlowbaseError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
