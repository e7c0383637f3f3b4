//! Snap-style HTTP payment gateway
//!
//! Creates a provider transaction and returns the token the client
//! uses to drive the payment popup. Requests carry a timeout and are
//! retried with exponential backoff; after the last attempt the error
//! surfaces as `Unavailable` and the order is left `unpaid/none`.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use shared::order::{Order, PaymentHandle};
use std::time::Duration;

use super::{GatewayError, PaymentGateway};

/// Initiation attempts before giving up
const MAX_ATTEMPTS: u32 = 3;

/// Base backoff between attempts (doubles each retry)
const BACKOFF_BASE: Duration = Duration::from_millis(250);

#[derive(Debug, Serialize)]
struct TransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: i64,
}

#[derive(Debug, Serialize)]
struct CustomerDetails<'a> {
    first_name: &'a str,
    phone: &'a str,
}

#[derive(Debug, Serialize)]
struct ChargeRequest<'a> {
    transaction_details: TransactionDetails<'a>,
    customer_details: CustomerDetails<'a>,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    token: String,
    #[serde(default)]
    redirect_url: Option<String>,
}

/// HTTP gateway against a Snap-style provider
pub struct SnapGateway {
    client: reqwest::Client,
    base_url: String,
    server_key: String,
}

impl SnapGateway {
    pub fn new(
        base_url: impl Into<String>,
        server_key: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("failed to build payment HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            server_key: server_key.into(),
        }
    }

    fn auth_header(&self) -> String {
        // Provider convention: basic auth, server key as username
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{}:", self.server_key));
        format!("Basic {encoded}")
    }

    async fn charge_once(&self, order: &Order) -> Result<PaymentHandle, GatewayError> {
        let body = ChargeRequest {
            transaction_details: TransactionDetails {
                order_id: &order.order_id,
                gross_amount: order.total,
            },
            customer_details: CustomerDetails {
                first_name: &order.customer_name,
                phone: &order.contact_handle,
            },
        };

        let response = self
            .client
            .post(format!("{}/snap/v1/transactions", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Unavailable(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let charge: ChargeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("bad provider response: {e}")))?;

        Ok(PaymentHandle {
            token: charge.token,
            redirect_url: charge.redirect_url,
        })
    }
}

#[async_trait]
impl PaymentGateway for SnapGateway {
    async fn initiate(&self, order: &Order) -> Result<PaymentHandle, GatewayError> {
        if order.total <= 0 {
            return Err(GatewayError::InvalidAmount(order.total));
        }

        let mut last_err = GatewayError::Unavailable("no attempt made".to_string());
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(BACKOFF_BASE * 2u32.pow(attempt - 1)).await;
            }
            match self.charge_once(order).await {
                Ok(handle) => return Ok(handle),
                Err(e @ GatewayError::Unavailable(_)) => {
                    tracing::warn!(
                        order_id = %order.order_id,
                        attempt = attempt + 1,
                        error = %e,
                        "Payment initiation attempt failed"
                    );
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err)
    }
}
