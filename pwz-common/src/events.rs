//! Draft lifecycle events and the EventBus
//!
//! Events are emitted by the reconciliation engine through its injected audit
//! sink. The EventBus fans them out to any number of subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Draft lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DraftEvent {
    /// Empty draft created at version 0
    DraftCreated {
        draft_id: Uuid,
        tenant_id: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// One or more sections merged and persisted
    SectionSaved {
        draft_id: Uuid,
        sections: Vec<String>,
        /// Version written by this save
        version: i64,
        percentage: u8,
        /// Persist attempts used, 1 when no conflict occurred
        attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// A concurrent writer won the compare-and-swap; the save is being remerged
    ConflictRetried {
        draft_id: Uuid,
        attempt: u32,
        timestamp: DateTime<Utc>,
    },

    /// Retry bound reached; the caller must reload and resubmit
    ConflictExhausted {
        draft_id: Uuid,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// Draft moved to the terminal `published` status
    DraftPublished {
        draft_id: Uuid,
        version: i64,
        timestamp: DateTime<Utc>,
    },
}

impl DraftEvent {
    /// Draft the event refers to
    pub fn draft_id(&self) -> Uuid {
        match self {
            DraftEvent::DraftCreated { draft_id, .. }
            | DraftEvent::SectionSaved { draft_id, .. }
            | DraftEvent::ConflictRetried { draft_id, .. }
            | DraftEvent::ConflictExhausted { draft_id, .. }
            | DraftEvent::DraftPublished { draft_id, .. } => *draft_id,
        }
    }

    /// Short event name for logs
    pub fn event_type(&self) -> &'static str {
        match self {
            DraftEvent::DraftCreated { .. } => "DraftCreated",
            DraftEvent::SectionSaved { .. } => "SectionSaved",
            DraftEvent::ConflictRetried { .. } => "ConflictRetried",
            DraftEvent::ConflictExhausted { .. } => "ConflictExhausted",
            DraftEvent::DraftPublished { .. } => "DraftPublished",
        }
    }
}

/// Central event distribution bus
///
/// Wraps `tokio::sync::broadcast`:
/// - Non-blocking publish (slow subscribers don't block the engine)
/// - Multiple concurrent subscribers
/// - Lagged subscribers lose the oldest events rather than stalling producers
///
/// # Examples
///
/// ```
/// use pwz_common::events::{DraftEvent, EventBus};
///
/// let event_bus = EventBus::new(64);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(DraftEvent::DraftCreated {
///     draft_id: uuid::Uuid::new_v4(),
///     tenant_id: None,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DraftEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<DraftEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: DraftEvent,
    ) -> Result<usize, broadcast::error::SendError<DraftEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DraftEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
