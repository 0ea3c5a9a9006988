use crate::status::StatusMessage;

/// Sink for status messages.
///
/// Executors and the coordinator publish through this trait rather than a
/// concrete channel, so tests can capture messages and embedders can plug in
/// their own transport. Publishing is fire-and-forget; a slow or absent
/// observer never blocks or fails a run.
pub trait StatusPublisher: Send + Sync {
    fn publish(
        &self,
        message: StatusMessage,
    );
}

/// Discards every message.
#[derive(Debug, Clone, Default)]
pub struct NoopPublisher;

impl StatusPublisher for NoopPublisher {
    fn publish(
        &self,
        _message: StatusMessage,
    ) {
    }
}
