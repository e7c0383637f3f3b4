//! Order domain model
//!
//! The order record is the single source of truth for lifecycle state.
//! The queue view (waiting line, active slot) is always re-derived from
//! order records, never persisted separately.

pub mod event;
pub mod payment;

pub use event::{LifecycleEvent, LifecycleEventType, LiveFrame, QueueSnapshot};
pub use payment::{PaymentHandle, PaymentNotification, PaymentOutcome};

use serde::{Deserialize, Serialize};

/// Payment state of an order
///
/// `Failed` is terminal: the provider reported a terminal failure
/// before the order ever entered the queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Unpaid,
    Paid,
    Failed,
}

/// Queue state of an order
///
/// Invariant: anything other than `None` implies `PaymentState::Paid`.
/// At most one order system-wide is `InPreparation` at any instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    None,
    Waiting,
    InPreparation,
    Done,
}

impl std::fmt::Display for QueueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueState::None => write!(f, "none"),
            QueueState::Waiting => write!(f, "waiting"),
            QueueState::InPreparation => write!(f, "in_preparation"),
            QueueState::Done => write!(f, "done"),
        }
    }
}

/// One line of an order
///
/// `unit_price` is snapshotted from the catalog at creation time and
/// never re-read, so later catalog price changes cannot retroactively
/// alter a placed order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub product_id: String,
    /// Product name snapshot (for display after catalog edits)
    pub product_name: String,
    pub quantity: u32,
    /// Unit price snapshot in rupiah
    pub unit_price: i64,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.unit_price * self.quantity as i64
    }
}

/// Order record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Opaque stable identity
    pub order_id: String,
    /// Customer-facing invoice number, globally unique
    pub invoice_id: String,
    pub customer_name: String,
    /// Contact handle (WhatsApp number in the original deployment)
    pub contact_handle: String,
    pub items: Vec<OrderItem>,
    /// Sum of quantity x unit_price, computed server-side at creation.
    /// Immutable once set.
    pub total: i64,
    pub payment_state: PaymentState,
    pub queue_state: QueueState,
    /// Monotonic queue number, assigned at admission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_number: Option<u64>,
    /// Unix millis of the transition into `waiting`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admitted_at: Option<i64>,
    /// Unix millis (creation)
    pub created_at: i64,
    /// Unix millis (last state change)
    pub updated_at: i64,
}

impl Order {
    /// Whether this order still participates in the lifecycle
    /// (shown in the initial snapshot sent to subscribers).
    pub fn is_non_terminal(&self) -> bool {
        self.payment_state != PaymentState::Failed && self.queue_state != QueueState::Done
    }

    /// Whether the order currently occupies the waiting line or the slot
    pub fn is_queued(&self) -> bool {
        matches!(
            self.queue_state,
            QueueState::Waiting | QueueState::InPreparation
        )
    }
}

/// Incoming order draft item (client supplies product refs only;
/// prices always come from the catalog)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftItem {
    pub product_id: String,
    pub quantity: u32,
}

/// Incoming order draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer_name: String,
    pub contact_handle: String,
    pub items: Vec<DraftItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_multiplies_quantity() {
        let item = OrderItem {
            product_id: "p1".into(),
            product_name: "Pinukuik".into(),
            quantity: 3,
            unit_price: 15000,
        };
        assert_eq!(item.line_total(), 45000);
    }

    #[test]
    fn queue_state_serializes_snake_case() {
        let s = serde_json::to_string(&QueueState::InPreparation).unwrap();
        assert_eq!(s, "\"in_preparation\"");
    }
}
