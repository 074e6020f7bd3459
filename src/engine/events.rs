/*!
 * Event Bus
 *
 * One bounded broadcast channel per `(barber_id, service_date)` key, created
 * lazily and held in a keyed registry alongside the coordinator lock (see
 * `engine::coordinator`). Ordering is trivially per-key; a slow subscriber on
 * one barber's stream cannot stall another's. Delivery is at-least-once, in
 * publication order per key. A subscriber that falls behind the configured
 * buffer observes `tokio::sync::broadcast::error::RecvError::Lagged` on its
 * next poll; `EventSubscription::recv` absorbs that by skipping ahead rather
 * than propagating the channel error — the resulting gap in `sequence`
 * between two delivered events is the "gap marker" itself, so no synthetic
 * event variant is needed.
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

/// The kind of change an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AppointmentCreated,
    AppointmentCancelled,
    AppointmentStatusChanged,
    QueuePositionChanged,
    QueuePriorityChanged,
    ScheduledTimeChanged,
}

/// Wire form of a single change event.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub event_type: EventType,
    pub barber_id: Uuid,
    pub service_date: NaiveDate,
    pub appointment_id: Uuid,
    pub sequence: u64,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub occurred_at: DateTime<Utc>,
}

type Key = (Uuid, NaiveDate);

struct Channel {
    sender: broadcast::Sender<EventRecord>,
    sequence: AtomicU64,
}

/// Publishes change events for notifier fan-out and live-view subscribers.
/// Not part of the core's correctness — subscribers are external.
pub struct EventBus {
    buffer_size: usize,
    channels: Mutex<HashMap<Key, Arc<Channel>>>,
}

impl EventBus {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn channel_for(&self, barber_id: Uuid, date: NaiveDate) -> Arc<Channel> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry((barber_id, date))
            .or_insert_with(|| {
                let (sender, _) = broadcast::channel(self.buffer_size);
                Arc::new(Channel {
                    sender,
                    sequence: AtomicU64::new(0),
                })
            })
            .clone()
    }

    /// Subscribes to the stream for one `(barber, date)` key, creating it
    /// lazily if this is the first subscriber.
    pub fn subscribe(&self, barber_id: Uuid, date: NaiveDate) -> EventSubscription {
        let channel = self.channel_for(barber_id, date);
        EventSubscription {
            receiver: channel.sender.subscribe(),
        }
    }

    /// Publishes one event, assigning the next `sequence` number for this key.
    pub fn publish(
        &self,
        barber_id: Uuid,
        date: NaiveDate,
        event_type: EventType,
        appointment_id: Uuid,
        before: Option<Value>,
        after: Option<Value>,
    ) {
        let channel = self.channel_for(barber_id, date);
        let sequence = channel.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let record = EventRecord {
            event_type,
            barber_id,
            service_date: date,
            appointment_id,
            sequence,
            before,
            after,
            occurred_at: Utc::now(),
        };
        // No receivers is not an error: the bus has no correctness dependency
        // on subscribers existing.
        let _ = channel.sender.send(record);
    }
}

/// A live subscription to one `(barber, date)` event stream.
pub struct EventSubscription {
    receiver: broadcast::Receiver<EventRecord>,
}

impl EventSubscription {
    /// Receives the next event, silently skipping ahead past any events lost
    /// to backpressure. Returns `None` only once every sender has dropped.
    pub async fn recv(&mut self) -> Option<EventRecord> {
        loop {
            match self.receiver.recv().await {
                Ok(record) => return Some(record),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
