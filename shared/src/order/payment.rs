//! Payment gateway contract types
//!
//! Only the reconciliation contract with the provider is modeled here.
//! The provider-specific wire format stays inside the gateway adapter.

use serde::{Deserialize, Serialize};

/// Normalized terminal-or-pending payment outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Success,
    /// Not yet terminal; no state change until a terminal outcome arrives
    Pending,
    Failure,
}

/// Provider token handed back to the client to drive the payment UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentHandle {
    /// Provider-specific token bound to the order and its immutable total
    pub token: String,
    /// Optional redirect URL some providers return alongside the token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

/// Normalized asynchronous payment notification
///
/// Delivered zero or more times, in no guaranteed order. The adapter
/// deduplicates by `provider_txn_id` before this reaches the
/// lifecycle controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotification {
    /// Provider's own transaction id (deduplication key)
    pub provider_txn_id: String,
    pub order_id: String,
    pub outcome: PaymentOutcome,
}
