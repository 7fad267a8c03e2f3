//! C5: Subscription Worker.
//!
//! One task per open stream, replacing the original's per-subscription
//! `fork()` with a `tokio::task` per spec.md §9's explicit substitution
//! note: "the source forks a child per subscription to isolate long-lived
//! loops from short request handlers... substitute a dedicated task per
//! subscription with the same three event sources; cancellation semantics
//! are equivalent." Grounded on
//! `original_source/apps/restconf/restconf_stream.c` (`restconf_stream_cb`,
//! `stream_checkuplink`, `stream_timeout`, `struct stream_child`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::backend::BackendTransport;

/// The client-facing half of a stream: writing raw bytes and detecting
/// downstream closure. `is_closed` stands in for both of the original's
/// upstream-liveness checks (`stream_checkuplink`'s immediate
/// `FCGX_GetError` test and `stream_timeout`'s recurring one) — the worker
/// calls it from two independent triggers (§F.6).
#[async_trait]
pub trait ClientSink: Send {
    /// Write a raw chunk of the SSE body. `Err` means the client connection
    /// is gone. Framing (the `data:`/`\r\n\r\n` record shape) is the
    /// worker's responsibility, not the sink's — see [`format_sse_record`].
    async fn write(&mut self, bytes: &str) -> std::io::Result<()>;

    /// True once the client connection is known to be closed or erroring.
    async fn is_closed(&mut self) -> bool;
}

/// Format one SSE `data:` record for `xml`, per spec.md §4.5/§8: only
/// `data:` and the blank-line separator, never `event:`/`id:` lines.
pub fn format_sse_record(xml: &str) -> String {
    format!("data: {xml}\r\n\r\n")
}

/// Runs a subscription's event loop to completion: relay notifications
/// until the backend closes the connection, the client goes away, or the
/// 1-second liveness timer observes the client is gone. Returns on any of
/// the three — cleanup (closing `transport`, releasing `client`) happens
/// via ordinary drop when this function returns, the loop's equivalent of
/// the original's "unregister all three sources, close the backend socket,
/// release the client handle."
pub async fn run(
    mut transport: Box<dyn BackendTransport>,
    mut client: Box<dyn ClientSink>,
    pretty: bool,
) {
    let mut liveness = tokio::time::interval(Duration::from_secs(1));
    liveness.tick().await; // first tick fires immediately; consume it before the loop

    loop {
        tokio::select! {
            notification = transport.recv_notification() => {
                match notification {
                    Ok(Some(node)) => {
                        let xml = if pretty { node.to_xml_string_pretty() } else { node.to_xml_string() };
                        let record = format_sse_record(&xml);
                        if client.write(&record).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // upstream closed
                    Err(_) => break,   // fatal backend read: treat as closure for this stream
                }
            }
            _ = liveness.tick() => {
                if client.is_closed().await {
                    break;
                }
            }
        }
        if client.is_closed().await {
            break;
        }
    }
}

/// Tracks running subscription workers keyed by a monotonic id (the
/// task-based analogue of `struct stream_child`'s pid). `remove` is the
/// `stream_child_free` equivalent (called once, by the worker itself, when
/// its loop exits); `clear` is `stream_child_freeall`.
pub struct SubscriptionRegistry {
    tasks: Mutex<HashMap<u64, JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> SubscriptionRegistry {
        SubscriptionRegistry {
            tasks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Spawn a worker and register it. The worker removes its own entry on
    /// exit, matching the "parent reaps the child... removes the matching
    /// subscription record" invariant without a separate reaper task.
    pub fn spawn(
        self: &Arc<Self>,
        transport: Box<dyn BackendTransport>,
        client: Box<dyn ClientSink>,
        pretty: bool,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let registry = Arc::clone(self);
        let handle = tokio::task::spawn(async move {
            run(transport, client, pretty).await;
            registry.remove(id);
        });
        self.tasks.lock().unwrap().insert(id, handle);
        id
    }

    /// Remove a subscription record, returning whether one was present.
    /// Idempotent: a second call for the same id (e.g. a double reap) is a
    /// no-op, preserving "removed exactly once" from the caller's
    /// perspective.
    pub fn remove(&self, id: u64) -> bool {
        self.tasks.lock().unwrap().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort and drop every running worker, for host shutdown.
    pub fn clear(&self) {
        let mut tasks = self.tasks.lock().unwrap();
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> SubscriptionRegistry {
        SubscriptionRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::tree::XmlNode;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::mpsc;

    struct ChannelTransport {
        rx: mpsc::Receiver<Option<XmlNode>>,
    }

    #[async_trait]
    impl BackendTransport for ChannelTransport {
        async fn call(&mut self, _request: &XmlNode) -> Result<XmlNode, EngineError> {
            unreachable!("worker only calls recv_notification")
        }

        async fn recv_notification(&mut self) -> Result<Option<XmlNode>, EngineError> {
            Ok(self.rx.recv().await.flatten())
        }
    }

    struct RecordingSink {
        events: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ClientSink for RecordingSink {
        async fn write(&mut self, bytes: &str) -> std::io::Result<()> {
            self.events.lock().unwrap().push(bytes.to_string());
            Ok(())
        }

        async fn is_closed(&mut self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn sse_record_is_data_line_plus_blank_line_only() {
        let record = format_sse_record("<notification><eventTime>1</eventTime></notification>");
        assert_eq!(
            record,
            "data: <notification><eventTime>1</eventTime></notification>\r\n\r\n"
        );
        assert!(!record.contains("event:"));
        assert!(!record.contains("id:"));
    }

    #[tokio::test]
    async fn relays_notifications_in_order_then_exits_on_upstream_close() {
        let (tx, rx) = mpsc::channel(4);
        let transport = Box::new(ChannelTransport { rx });
        let events = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let sink = Box::new(RecordingSink { events: events.clone(), closed });

        tx.send(Some(XmlNode::with_text("notification", "1"))).await.unwrap();
        tx.send(Some(XmlNode::with_text("notification", "2"))).await.unwrap();
        tx.send(None).await.unwrap(); // upstream closed

        run(transport, sink, false).await;

        let seen = events.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                "data: <notification>1</notification>\r\n\r\n",
                "data: <notification>2</notification>\r\n\r\n",
            ]
        );
    }

    #[tokio::test]
    async fn registry_removes_entry_when_worker_exits() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let (_tx, rx) = mpsc::channel(1);
        let transport = Box::new(ChannelTransport { rx });
        let closed = Arc::new(AtomicBool::new(false));
        let sink = Box::new(RecordingSink { events: Arc::new(Mutex::new(Vec::new())), closed });

        let id = registry.spawn(transport, sink, false);
        assert_eq!(registry.len(), 1);
        drop(_tx); // closes the channel -> recv_notification returns Ok(None)

        for _ in 0..100 {
            if registry.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(registry.is_empty());
        assert!(!registry.remove(id));
    }
}
