//! Graceful-termination latch shared between engine components.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::Notify;

/// One-shot shutdown signal.
///
/// `shutdown()` trips the latch exactly once; every current and future
/// `wait()` resolves after that. Cloning shares the same latch.
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    notify: Notify,
    terminated: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the latch and wake all waiters.
    pub fn shutdown(&self) {
        self.inner.terminated.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::SeqCst)
    }

    /// Resolves once the latch has been tripped.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let inner = self.inner.clone();
        async move {
            loop {
                // Register interest before re-checking the flag so a signal
                // between the check and the await is not lost.
                let notified = inner.notify.notified();
                if inner.terminated.load(Ordering::SeqCst) {
                    return;
                }
                notified.await;
            }
        }
    }
}
