//! Payment gateway adapter
//!
//! Translates an internal order into a payment-initiation request and
//! normalizes the provider's asynchronous outcome notifications into
//! the reconciliation contract the lifecycle controller understands.
//! Only that contract is modeled here; the provider's wire format
//! never leaks past this module.

pub mod snap;

use async_trait::async_trait;
use serde::Deserialize;
use shared::order::{Order, PaymentHandle, PaymentNotification, PaymentOutcome};
use thiserror::Error;

pub use snap::SnapGateway;

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The total must be positive to initiate payment
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Provider unreachable after bounded retries; the order stays
    /// `unpaid/none` and the customer may retry.
    #[error("Payment provider unavailable: {0}")]
    Unavailable(String),
}

/// Payment initiation seam
///
/// The HTTP implementation lives in [`snap`]; tests and gateway-less
/// development deployments use [`MockGateway`].
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Request a provider token bound to the order and its immutable total
    async fn initiate(&self, order: &Order) -> Result<PaymentHandle, GatewayError>;
}

/// Raw provider callback envelope (Midtrans-style field names)
#[derive(Debug, Deserialize)]
pub struct ProviderNotification {
    pub transaction_id: String,
    pub order_id: String,
    pub transaction_status: String,
}

/// Normalize a provider envelope into the reconciliation contract
///
/// Unknown statuses yield `None` and are logged and dropped by the
/// caller; the HTTP layer acknowledges regardless.
pub fn normalize(raw: &ProviderNotification) -> Option<PaymentNotification> {
    let outcome = match raw.transaction_status.as_str() {
        "settlement" | "capture" => PaymentOutcome::Success,
        "pending" => PaymentOutcome::Pending,
        "deny" | "cancel" | "expire" | "failure" => PaymentOutcome::Failure,
        other => {
            tracing::warn!(
                transaction_id = %raw.transaction_id,
                status = %other,
                "Unknown provider transaction status dropped"
            );
            return None;
        }
    };
    Some(PaymentNotification {
        provider_txn_id: raw.transaction_id.clone(),
        order_id: raw.order_id.clone(),
        outcome,
    })
}

/// In-process gateway for tests and gateway-less development
///
/// Issues deterministic tokens immediately; outcomes are driven by
/// posting callbacks, same as with a real provider.
#[derive(Debug, Default)]
pub struct MockGateway;

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initiate(&self, order: &Order) -> Result<PaymentHandle, GatewayError> {
        if order.total <= 0 {
            return Err(GatewayError::InvalidAmount(order.total));
        }
        Ok(PaymentHandle {
            token: format!("mock-{}", order.order_id),
            redirect_url: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: &str) -> ProviderNotification {
        ProviderNotification {
            transaction_id: "txn-1".into(),
            order_id: "order-1".into(),
            transaction_status: status.into(),
        }
    }

    #[test]
    fn normalizes_known_statuses() {
        assert_eq!(
            normalize(&raw("settlement")).unwrap().outcome,
            PaymentOutcome::Success
        );
        assert_eq!(
            normalize(&raw("capture")).unwrap().outcome,
            PaymentOutcome::Success
        );
        assert_eq!(
            normalize(&raw("pending")).unwrap().outcome,
            PaymentOutcome::Pending
        );
        assert_eq!(
            normalize(&raw("expire")).unwrap().outcome,
            PaymentOutcome::Failure
        );
    }

    #[test]
    fn drops_unknown_statuses() {
        assert!(normalize(&raw("refund")).is_none());
    }

    #[tokio::test]
    async fn mock_gateway_rejects_non_positive_total() {
        let gateway = MockGateway;
        let mut order = test_order();
        order.total = 0;
        assert!(matches!(
            gateway.initiate(&order).await,
            Err(GatewayError::InvalidAmount(0))
        ));
    }

    fn test_order() -> Order {
        use shared::order::{PaymentState, QueueState};
        Order {
            order_id: "order-1".into(),
            invoice_id: "INV-20250101-0001".into(),
            customer_name: "Budi".into(),
            contact_handle: "0812345678".into(),
            items: vec![],
            total: 50000,
            payment_state: PaymentState::Unpaid,
            queue_state: QueueState::None,
            queue_number: None,
            admitted_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }
}
