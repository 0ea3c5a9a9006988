use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use tokio::runtime::Runtime;

use crate::{
    ShareLock,
    common::{BroadcastQueue, Shutdown},
    status::{StatusMessage, StatusPublisher},
};

macro_rules! dispatch_event {
    ($handles:expr, $(&$item:ident), +) => {
        let handlers = $handles.read().unwrap();
        for handle in handlers.iter() {
            (handle)($(&$item),+);
        }
    };
}

macro_rules! dispatch_event_async {
    ($handles:expr, $(&$item:ident), +) => {
        let handles = $handles.clone();

        tokio::spawn(async move {
            let handlers = handles.read().unwrap().clone();
            for handle in handlers.iter() {
                (handle)($(&$item),+).await;
            }
        });
    };
}

const EVENT_QUEUE_SIZE: usize = 2048;

pub type StatusHandle = Arc<dyn Fn(&StatusMessage) + Send + Sync>;
pub type StatusHandleAsync = Arc<dyn Fn(&StatusMessage) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    /// use the glob pattern to match the execution id
    /// eg. evt_1*
    pub eid: String,

    /// use the glob pattern to match the node id
    /// eg. nid1*
    pub nid: String,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            eid: "*".to_string(),
            nid: "*".to_string(),
        }
    }
}

impl SubscribeOptions {
    pub fn new(
        eid: String,
        nid: String,
    ) -> Self {
        Self {
            eid,
            nid,
        }
    }

    pub fn with_eid(eid: String) -> Self {
        Self {
            eid,
            nid: "*".to_string(),
        }
    }

    pub fn with_nid(nid: String) -> Self {
        Self {
            eid: "*".to_string(),
            nid,
        }
    }
}

/// Broadcast hub for status messages.
///
/// Run-level events match subscriptions with an empty node id against the
/// `nid` glob `*` only when the subscription does not narrow by node.
#[derive(Clone)]
pub struct Channel {
    event_queue: Arc<BroadcastQueue<StatusMessage>>,

    events: ShareLock<Vec<StatusHandle>>,
    events_async: ShareLock<Vec<StatusHandleAsync>>,

    runtime: Arc<Runtime>,
    shutdown: Shutdown,
}

impl Channel {
    pub(crate) fn new(runtime: Arc<Runtime>) -> Self {
        Self {
            event_queue: BroadcastQueue::new(EVENT_QUEUE_SIZE),
            events: Arc::new(RwLock::new(Vec::new())),
            events_async: Arc::new(RwLock::new(Vec::new())),
            runtime,
            shutdown: Shutdown::default(),
        }
    }

    pub(crate) fn event_queue(&self) -> Arc<BroadcastQueue<StatusMessage>> {
        self.event_queue.clone()
    }

    pub(crate) fn listen(&self) {
        let mut event_queue = self.event_queue.subscribe();
        let events = self.events.clone();
        let events_async = self.events_async.clone();

        let shutdown = self.shutdown.clone();
        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    Ok(e) = event_queue.recv() => {
                        let msg = e.clone();
                        dispatch_event!(events, &msg);
                        dispatch_event_async!(events_async, &e);
                    }
                }
            }
        });
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.shutdown();
    }
}

impl StatusPublisher for Channel {
    fn publish(
        &self,
        message: StatusMessage,
    ) {
        let _ = self.event_queue.send(message);
    }
}

/// A filtered view over a [`Channel`].
#[derive(Clone)]
pub struct StatusSubscription {
    channel: Arc<Channel>,

    glob: (globset::GlobMatcher, globset::GlobMatcher),
}

#[allow(unused)]
impl StatusSubscription {
    pub fn channel(
        channel: Arc<Channel>,
        options: SubscribeOptions,
    ) -> Self {
        Self {
            channel,
            glob: (
                globset::Glob::new(&options.eid).unwrap().compile_matcher(),
                globset::Glob::new(&options.nid).unwrap().compile_matcher(),
            ),
        }
    }

    pub fn on_complete(
        &self,
        f: impl Fn(String) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if e.event.is_complete() && is_match(&glob, e) {
                f(e.eid.clone());
            }
        }));
    }

    pub fn on_error(
        &self,
        f: impl Fn(&StatusMessage) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if e.event.is_error() && is_match(&glob, e) {
                f(e);
            }
        }));
    }

    pub fn on_event(
        &self,
        f: impl Fn(&StatusMessage) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap().push(Arc::new(move |e| {
            if is_match(&glob, e) {
                f(e);
            }
        }));
    }

    pub fn on_event_async<F>(
        &self,
        f: F,
    ) where
        F: Fn(&StatusMessage) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let glob = self.glob.clone();

        self.channel.events_async.write().unwrap().push(Arc::new(move |e| {
            if is_match(&glob, e) {
                f(e)
            } else {
                Box::pin(async {})
            }
        }));
    }
}

fn is_match(
    glob: &(globset::GlobMatcher, globset::GlobMatcher),
    e: &StatusMessage,
) -> bool {
    let (pat_eid, pat_nid) = glob;
    pat_eid.is_match(&e.eid) && pat_nid.is_match(&e.nid)
}
