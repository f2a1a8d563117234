//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`HistoryBus`] is the publish/subscribe hub for [`HistoryEvent`]s. It is
//! designed to be shared via `Arc<HistoryBus>` across the host application,
//! which decides what to do with history notifications (audit feeds, cache
//! invalidation, webhooks).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use retrace_core::record::VersionRecord;
use retrace_core::types::DbId;

/// Event type emitted when a change was recorded as a new version.
pub const VERSION_RECORDED: &str = "version.recorded";

/// Event type emitted when an entity was reverted to a prior version.
pub const ENTITY_REVERTED: &str = "entity.reverted";

// ---------------------------------------------------------------------------
// HistoryEvent
// ---------------------------------------------------------------------------

/// A notification that an entity's version history advanced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    /// Dot-separated event name, e.g. `"version.recorded"`.
    pub event_type: String,

    /// Owner entity kind.
    pub owner_type: String,

    /// Owner entity id.
    pub owner_id: DbId,

    /// Number of the appended record.
    pub number: i64,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl HistoryEvent {
    /// Event for an ordinary forward change.
    pub fn version_recorded(record: &VersionRecord) -> Self {
        Self {
            event_type: VERSION_RECORDED.to_string(),
            owner_type: record.owner.owner_type.clone(),
            owner_id: record.owner.owner_id,
            number: record.number,
            payload: serde_json::json!({
                "changed_fields": record.change_set.fields().collect::<Vec<_>>(),
                "created_by": record.created_by,
            }),
            timestamp: Utc::now(),
        }
    }

    /// Event for a revert. The payload carries both the physical record
    /// number and the logical target it restored.
    pub fn entity_reverted(record: &VersionRecord) -> Self {
        Self {
            event_type: ENTITY_REVERTED.to_string(),
            owner_type: record.owner.owner_type.clone(),
            owner_id: record.owner.owner_id,
            number: record.number,
            payload: serde_json::json!({
                "reverted_from": record.reverted_from,
                "effective_version": record.effective_number(),
                "created_by": record.created_by,
            }),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for history events.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`HistoryEvent`].
pub struct HistoryBus {
    sender: broadcast::Sender<HistoryEvent>,
}

impl HistoryBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// history itself is already durable in the store.
    pub fn publish(&self, event: HistoryEvent) {
        tracing::trace!(event_type = %event.event_type, "publishing history event");
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.sender.subscribe()
    }
}

impl Default for HistoryBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use retrace_core::{ChangeSet, OwnerRef};

    fn record(number: i64, reverted_from: Option<i64>) -> VersionRecord {
        VersionRecord {
            owner: OwnerRef::new("page", 42),
            number,
            change_set: ChangeSet::default(),
            reverted_from,
            created_by: Some(7),
            tag: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = HistoryBus::default();
        let mut rx = bus.subscribe();

        bus.publish(HistoryEvent::version_recorded(&record(3, None)));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, VERSION_RECORDED);
        assert_eq!(received.owner_type, "page");
        assert_eq!(received.owner_id, 42);
        assert_eq!(received.number, 3);
        assert_eq!(received.payload["created_by"], 7);
    }

    #[tokio::test]
    async fn revert_event_carries_the_logical_target() {
        let bus = HistoryBus::default();
        let mut rx = bus.subscribe();

        bus.publish(HistoryEvent::entity_reverted(&record(5, Some(2))));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, ENTITY_REVERTED);
        assert_eq!(received.number, 5);
        assert_eq!(received.payload["reverted_from"], 2);
        assert_eq!(received.payload["effective_version"], 2);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = HistoryBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(HistoryEvent::version_recorded(&record(1, None)));

        assert_eq!(rx1.recv().await.unwrap().number, 1);
        assert_eq!(rx2.recv().await.unwrap().number, 1);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = HistoryBus::default();
        // No subscribers — this must not panic.
        bus.publish(HistoryEvent::version_recorded(&record(1, None)));
    }
}
