//! Live status events for workflow runs.
//!
//! Every run emits run-level and node-level status messages through a
//! broadcast [`Channel`]. Observers subscribe with glob filters over event id
//! and node id; persistence of the same stream is handled separately by the
//! engine's monitor.

mod channel;
mod events;
mod publisher;

pub use channel::{Channel, StatusSubscription, SubscribeOptions};
pub use events::{NodeEvent, RunEvent, RunFailedEvent, RunStartedEvent, StatusEvent, StatusMessage};
pub use publisher::{NoopPublisher, StatusPublisher};
