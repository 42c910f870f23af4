use crate::error::CdcError;
use crate::event::Event;
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

/// The lifecycle state of one table's change buffer (§4.8):
/// `Idle` is the absence of an entry; `Active` has at least one live
/// subscriber; `Closed` is the buffer left behind by the last unsubscribe
/// (kept so in-flight publishes have somewhere to land without re-allocating
/// a new channel on every stray event); `Terminated` marks a stream-fatal
/// condition, cleared by the next publish, which recreates the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferStatus {
    Idle,
    Active,
    Closed,
    Terminated,
}

struct Buffer {
    sender: broadcast::Sender<Event>,
    subscriber_count: Arc<AtomicUsize>,
    terminated: Arc<AtomicBool>,
}

impl Buffer {
    fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, subscriber_count: Arc::new(AtomicUsize::new(0)), terminated: Arc::new(AtomicBool::new(false)) }
    }

    fn status(&self) -> BufferStatus {
        if self.terminated.load(Ordering::SeqCst) {
            BufferStatus::Terminated
        } else if self.subscriber_count.load(Ordering::SeqCst) > 0 {
            BufferStatus::Active
        } else {
            BufferStatus::Closed
        }
    }

    /// Recreates the broadcast channel if this buffer was left `Terminated`,
    /// the `Terminated` → `Active` transition from §4.8's state diagram.
    fn ensure_active(&mut self, capacity: usize) {
        if self.terminated.swap(false, Ordering::SeqCst) {
            let (sender, _) = broadcast::channel(capacity);
            self.sender = sender;
        }
    }
}

/// A single table's one-producer, many-consumer change buffer, created
/// lazily and torn down when the last subscriber leaves. Publishing and
/// subscribing only briefly hold the registry mutex to look up or create a
/// table's entry; the broadcast send/receive itself is lock-free (§5).
pub struct CdcRegistry {
    buffers: Mutex<HashMap<String, Buffer>>,
    capacity: usize,
}

/// Drops the subscriber count for a table's buffer when a subscription
/// stream is dropped, driving the `Active` → `Closed` transition.
struct SubscriberGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One subscriber's view of a table's changes: every delivered [`Event`]
/// until either the caller drops the stream or a slow-consumer overflow
/// delivers one terminal error and ends it (§4.8 backpressure contract).
#[derive(Debug, Clone, PartialEq)]
pub enum CdcMessage {
    Event(Event),
    Overflow { skipped: u64 },
}

impl CdcRegistry {
    /// `capacity` bounds each table's broadcast buffer; a subscriber more
    /// than `capacity` events behind the fastest one sees [`BroadcastStreamRecvError::Lagged`]
    /// and is dropped (Open Question-adjacent: the threshold is
    /// implementation-defined, so this is the knob `EngineConfig` exposes).
    pub fn new(capacity: usize) -> Self {
        Self { buffers: Mutex::new(HashMap::new()), capacity }
    }

    pub fn status(&self, table: &str) -> BufferStatus {
        self.buffers.lock().expect("cdc registry mutex poisoned").get(table).map(Buffer::status).unwrap_or(BufferStatus::Idle)
    }

    /// Subscribes to a table's buffer, creating it if this is the first
    /// subscriber (`Idle` → `Active`).
    pub fn subscribe(&self, table: &str) -> BoxStream<'static, CdcMessage> {
        let mut buffers = self.buffers.lock().expect("cdc registry mutex poisoned");
        let buffer = buffers.entry(table.to_string()).or_insert_with(|| Buffer::new(self.capacity));
        buffer.ensure_active(self.capacity);
        buffer.subscriber_count.fetch_add(1, Ordering::SeqCst);

        let receiver = buffer.sender.subscribe();
        let guard = SubscriberGuard { count: buffer.subscriber_count.clone() };

        BroadcastStream::new(receiver)
            .scan((false, guard), |(stopped, _guard), item| {
                if *stopped {
                    return std::future::ready(None);
                }
                let message = match item {
                    Ok(event) => CdcMessage::Event(event),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        *stopped = true;
                        CdcMessage::Overflow { skipped }
                    }
                };
                std::future::ready(Some(message))
            })
            .boxed()
    }

    /// Publishes an event to a table's buffer. A table nobody has ever
    /// subscribed to has no buffer and the event is simply dropped; a
    /// `Terminated` buffer is recreated first (§4.8's recovery transition).
    pub fn publish(&self, event: Event) {
        let mut buffers = self.buffers.lock().expect("cdc registry mutex poisoned");
        if let Some(buffer) = buffers.get_mut(&event.table) {
            buffer.ensure_active(self.capacity);
            let _ = buffer.sender.send(event);
        }
    }

    /// Marks a table's buffer stream-fatal, simulating the upstream
    /// replication reader dying (`Active` → `Terminated`). Existing
    /// subscribers keep their receiver but see no further events until the
    /// next publish recreates the channel.
    pub fn mark_stream_fatal(&self, table: &str) -> Result<(), CdcError> {
        let mut buffers = self.buffers.lock().expect("cdc registry mutex poisoned");
        match buffers.get_mut(table) {
            Some(buffer) => {
                buffer.terminated.store(true, Ordering::SeqCst);
                Ok(())
            }
            None => Err(CdcError::UnknownTable(table.to_string())),
        }
    }

    /// Publishes a synthetic event, used by tests to drive the state
    /// machine without a live logical-replication connection.
    pub fn republish_for_tests(&self, event: Event) {
        self.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::event::Event;
    use chrono::Utc;
    use std::collections::HashMap as Map;

    fn sample_event(table: &str, lsn: u64) -> Event {
        Event::insert("public", table, lsn, Map::new(), Utc::now())
    }

    #[test]
    fn a_table_with_no_subscribers_is_idle() {
        let registry = CdcRegistry::new(8);
        assert_eq!(registry.status("customer"), BufferStatus::Idle);
    }

    #[tokio::test]
    async fn subscribing_activates_the_buffer_and_unsubscribing_closes_it() {
        let registry = CdcRegistry::new(8);
        {
            let _stream = registry.subscribe("customer");
            assert_eq!(registry.status("customer"), BufferStatus::Active);
        }
        assert_eq!(registry.status("customer"), BufferStatus::Closed);
    }

    #[tokio::test]
    async fn a_subscriber_receives_published_events_in_order() {
        let registry = CdcRegistry::new(8);
        let mut stream = registry.subscribe("customer");
        registry.republish_for_tests(sample_event("customer", 1));
        registry.republish_for_tests(sample_event("customer", 2));

        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();
        match (first, second) {
            (CdcMessage::Event(a), CdcMessage::Event(b)) => assert!(a.lsn < b.lsn),
            other => panic!("expected two events, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn a_lagged_subscriber_gets_one_overflow_message_then_ends() {
        let registry = CdcRegistry::new(2);
        let mut stream = registry.subscribe("customer");
        for lsn in 1..=5 {
            registry.republish_for_tests(sample_event("customer", lsn));
        }

        let first = stream.next().await.unwrap();
        assert!(matches!(first, CdcMessage::Overflow { .. }));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn a_terminated_buffer_reactivates_on_the_next_publish() {
        let registry = CdcRegistry::new(8);
        let _stream = registry.subscribe("customer");
        registry.mark_stream_fatal("customer").unwrap();
        assert_eq!(registry.status("customer"), BufferStatus::Terminated);

        registry.publish(sample_event("customer", 1));
        assert_eq!(registry.status("customer"), BufferStatus::Active);
    }

    #[test]
    fn marking_an_unknown_table_fatal_is_an_error() {
        let registry = CdcRegistry::new(8);
        assert!(matches!(registry.mark_stream_fatal("ghost"), Err(CdcError::UnknownTable(_))));
    }
}
