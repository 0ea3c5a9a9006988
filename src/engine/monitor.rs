//! Persists the status stream into durable history.
//!
//! The monitor is the only writer of `events` and `node_runs` rows; the
//! coordinator owns the terminal state of `executions`. Splitting the writers
//! this way keeps the run history consistent without double writes.

use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::warn;

use crate::{
    Result,
    common::Shutdown,
    status::{Channel, NodeEvent, RunEvent, StatusEvent, StatusMessage},
    store::{Store, data},
    utils,
};

#[derive(Clone)]
pub struct Monitor {
    store: Arc<Store>,
    channel: Arc<Channel>,

    runtime: Arc<Runtime>,
    shutdown: Shutdown,
}

impl Monitor {
    pub fn new(
        store: Arc<Store>,
        channel: Arc<Channel>,
        runtime: Arc<Runtime>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            store,
            channel,
            runtime,
            shutdown,
        }
    }

    /// Spawns the persistence loop on the engine runtime.
    ///
    /// A storage fault on one message is logged and the loop moves on; the
    /// broadcast stream must never stall behind the store.
    pub fn monitor(&self) {
        let mut event_queue = self.channel.event_queue().subscribe();
        let store = self.store.clone();

        let shutdown = self.shutdown.clone();
        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    Ok(e) = event_queue.recv() => {
                        if let Err(err) = Self::on_message(&store, &e) {
                            warn!("monitor failed to persist event for execution {}: {}", e.eid, err);
                        }
                    }
                }
            }
        });
    }

    fn on_message(
        store: &Arc<Store>,
        message: &StatusMessage,
    ) -> Result<()> {
        let (name, detail) = match &message.event {
            StatusEvent::Run(e) => (e.str(), run_detail(e)),
            StatusEvent::Node(e) => (e.str(), node_detail(e)),
        };
        store.events().create(&data::EventRecord {
            id: utils::longid(),
            eid: message.eid.clone(),
            nid: message.nid.clone(),
            name: name.to_string(),
            message: detail,
            timestamp: utils::time::time_millis(),
        })?;

        match &message.event {
            StatusEvent::Run(RunEvent::Started(e)) => Self::init_node_runs(store, &message.eid, &e.node_ids),
            StatusEvent::Run(_) => Ok(()),
            StatusEvent::Node(e) => Self::update_node_run(store, message, e),
        }
    }

    /// Creates one Pending row per scheduled node so observers see the full
    /// plan before the first node starts. Rows surviving a redelivered event
    /// are left as they are.
    fn init_node_runs(
        store: &Arc<Store>,
        eid: &str,
        node_ids: &[String],
    ) -> Result<()> {
        for nid in node_ids {
            let id = format!("{}-{}", eid, nid);
            if store.node_runs().exists(&id)? {
                continue;
            }
            store.node_runs().create(&data::NodeRun {
                id,
                eid: eid.to_string(),
                nid: nid.clone(),
                status: "Pending".to_string(),
                err: None,
                start_time: 0,
                end_time: 0,
                timestamp: utils::time::time_millis(),
            })?;
        }
        Ok(())
    }

    fn update_node_run(
        store: &Arc<Store>,
        message: &StatusMessage,
        event: &NodeEvent,
    ) -> Result<()> {
        let id = format!("{}-{}", message.eid, message.nid);
        let mut run = match store.node_runs().find(&id) {
            Ok(run) => run,
            // A node event can outrun the Started batch; start from a fresh row.
            Err(_) => data::NodeRun {
                id: id.clone(),
                eid: message.eid.clone(),
                nid: message.nid.clone(),
                status: "Pending".to_string(),
                err: None,
                start_time: 0,
                end_time: 0,
                timestamp: utils::time::time_millis(),
            },
        };

        run.status = event.str().to_string();
        match event {
            NodeEvent::Loading(at) => run.start_time = *at,
            NodeEvent::Success(at) => run.end_time = *at,
            NodeEvent::Error {
                at,
                reason,
            } => {
                run.end_time = *at;
                run.err = Some(reason.clone());
            }
        }

        if store.node_runs().exists(&id)? {
            store.node_runs().update(&run)?;
        } else {
            store.node_runs().create(&run)?;
        }
        Ok(())
    }
}

fn run_detail(event: &RunEvent) -> Option<String> {
    match event {
        RunEvent::Started(e) => Some(e.node_ids.join(",")),
        RunEvent::Succeeded => None,
        RunEvent::Failed(e) => Some(e.error.clone()),
    }
}

fn node_detail(event: &NodeEvent) -> Option<String> {
    match event {
        NodeEvent::Error {
            reason, ..
        } => Some(reason.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        status::{RunFailedEvent, RunStartedEvent, StatusPublisher},
        store::query::Query,
    };

    fn setup() -> (Arc<Store>, Arc<Channel>, Monitor) {
        let rt = Arc::new(tokio::runtime::Runtime::new().unwrap());
        let store = Arc::new(Store::mem());
        let channel = Arc::new(Channel::new(rt.clone()));
        let monitor = Monitor::new(store.clone(), channel.clone(), rt, Shutdown::new());
        monitor.monitor();
        (store, channel, monitor)
    }

    fn wait_persist() {
        std::thread::sleep(Duration::from_millis(200));
    }

    #[test]
    fn test_started_event_initializes_pending_node_runs() {
        let (store, channel, _monitor) = setup();

        channel.publish(StatusMessage::run(
            "evt_1",
            RunEvent::Started(RunStartedEvent {
                node_ids: vec!["n1".to_string(), "n2".to_string()],
            }),
        ));
        wait_persist();

        let n1 = store.node_runs().find("evt_1-n1").unwrap();
        assert_eq!(n1.status, "Pending");
        assert_eq!(n1.eid, "evt_1");
        let n2 = store.node_runs().find("evt_1-n2").unwrap();
        assert_eq!(n2.nid, "n2");
    }

    #[test]
    fn test_node_events_advance_the_node_run() {
        let (store, channel, _monitor) = setup();

        channel.publish(StatusMessage::run(
            "evt_1",
            RunEvent::Started(RunStartedEvent {
                node_ids: vec!["n1".to_string()],
            }),
        ));
        channel.publish(StatusMessage::node("evt_1", "n1", "http_request", NodeEvent::Loading(10)));
        channel.publish(StatusMessage::node("evt_1", "n1", "http_request", NodeEvent::Success(20)));
        wait_persist();

        let run = store.node_runs().find("evt_1-n1").unwrap();
        assert_eq!(run.status, "Success");
        assert_eq!(run.start_time, 10);
        assert_eq!(run.end_time, 20);
        assert!(run.err.is_none());
    }

    #[test]
    fn test_node_error_records_the_reason() {
        let (store, channel, _monitor) = setup();

        channel.publish(StatusMessage::node(
            "evt_1",
            "n1",
            "chat_webhook",
            NodeEvent::Error {
                at: 30,
                reason: "webhook rejected the message with status 400".to_string(),
            },
        ));
        wait_persist();

        let run = store.node_runs().find("evt_1-n1").unwrap();
        assert_eq!(run.status, "Error");
        assert_eq!(run.end_time, 30);
        assert_eq!(run.err.as_deref(), Some("webhook rejected the message with status 400"));
    }

    #[test]
    fn test_every_message_lands_in_the_event_log() {
        let (store, channel, _monitor) = setup();

        channel.publish(StatusMessage::run(
            "evt_9",
            RunEvent::Started(RunStartedEvent {
                node_ids: vec!["n1".to_string()],
            }),
        ));
        channel.publish(StatusMessage::node("evt_9", "n1", "trigger", NodeEvent::Loading(1)));
        channel.publish(StatusMessage::node("evt_9", "n1", "trigger", NodeEvent::Success(2)));
        channel.publish(StatusMessage::run(
            "evt_9",
            RunEvent::Failed(RunFailedEvent {
                error: "boom".to_string(),
            }),
        ));
        wait_persist();

        let q = Query::new().push("eid", "evt_9").set_order("timestamp", false);
        let page = store.events().query(&q).unwrap();
        assert_eq!(page.count, 4);

        let names: Vec<&str> = page.rows.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"Running"));
        assert!(names.contains(&"Failed"));
        let failed = page.rows.iter().find(|e| e.name == "Failed").unwrap();
        assert_eq!(failed.message.as_deref(), Some("boom"));
    }
}
