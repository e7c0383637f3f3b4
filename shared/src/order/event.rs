//! Lifecycle events - immutable facts recorded after each transition

use super::{Order, QueueState};
use serde::{Deserialize, Serialize};

/// Event type enumeration
///
/// One per row of the lifecycle transition table. Creation itself is
/// not a queue transition; fresh subscribers see new orders through
/// the snapshot instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEventType {
    /// Payment confirmed, order entered the waiting line
    OrderAdmitted,
    /// Terminal payment failure before queue participation
    OrderCancelled,
    /// Order promoted into the single preparation slot
    PreparationStarted,
    /// Order left the slot as done
    OrderCompleted,
}

impl std::fmt::Display for LifecycleEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleEventType::OrderAdmitted => write!(f, "ORDER_ADMITTED"),
            LifecycleEventType::OrderCancelled => write!(f, "ORDER_CANCELLED"),
            LifecycleEventType::PreparationStarted => write!(f, "PREPARATION_STARTED"),
            LifecycleEventType::OrderCompleted => write!(f, "ORDER_COMPLETED"),
        }
    }
}

/// Lifecycle event - immutable audit record
///
/// `sequence` is the process-wide monotonic counter allocated in the
/// same storage transaction as the state swap; observers use it to
/// detect gaps and request a resync instead of silently diverging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number (for ordering and replay)
    pub sequence: u64,
    pub order_id: String,
    pub event_type: LifecycleEventType,
    pub previous_queue_state: QueueState,
    pub new_queue_state: QueueState,
    /// Queue number, present once the order has been admitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_number: Option<u64>,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
}

/// Snapshot of all non-terminal orders, sent on (re)subscribe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Last event sequence covered by this snapshot
    pub sequence: u64,
    pub orders: Vec<Order>,
}

/// Frame pushed to live subscribers
///
/// At-least-once delivery: subscribers must treat re-application of an
/// already-seen sequence as a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum LiveFrame {
    /// Full state - replaces everything the subscriber holds
    Snapshot(QueueSnapshot),
    /// Incremental lifecycle event
    Event(LifecycleEvent),
    /// The requested replay point is gone; a fresh snapshot follows
    Resync { last_sequence: u64 },
}
