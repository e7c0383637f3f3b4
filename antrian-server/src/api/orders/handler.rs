//! Order API Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::order::{Order, OrderDraft, PaymentHandle};

use crate::core::ServerState;
use crate::payment::{self, ProviderNotification};
use crate::utils::validation::{validate_contact_handle, validate_required_text, MAX_NAME_LEN};
use crate::utils::{ok, AppResponse, AppResult};

/// Response for order creation
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub invoice_id: String,
    /// Server-recomputed total - the client's own arithmetic is never used
    pub total: i64,
    /// Absent when the gateway was unreachable; the client retries via
    /// `POST /api/orders/{id}/payment` using the ids above.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_handle: Option<PaymentHandle>,
}

/// POST /api/orders - Create a draft order and initiate payment
///
/// The order is persisted `unpaid/none` before the gateway call. A
/// gateway failure still answers with the order's identifiers (502,
/// no handle) so the customer can reach the payment-retry endpoint.
pub async fn create(
    State(state): State<ServerState>,
    Json(draft): Json<OrderDraft>,
) -> AppResult<Response> {
    validate_required_text(&draft.customer_name, "customer_name", MAX_NAME_LEN)?;
    validate_contact_handle(&draft.contact_handle)?;

    let (order, payment_handle) = state.lifecycle.create_order(&draft).await?;

    let body = CreateOrderResponse {
        order_id: order.order_id,
        invoice_id: order.invoice_id,
        total: order.total,
        payment_handle,
    };

    if body.payment_handle.is_some() {
        return Ok(ok(body).into_response());
    }
    Ok((
        StatusCode::BAD_GATEWAY,
        Json(AppResponse {
            error: "gateway_error".to_string(),
            message: "Payment provider unavailable; re-request a payment handle for this order"
                .to_string(),
            data: Some(body),
        }),
    )
        .into_response())
}

/// GET /api/orders/:id - Fetch an order
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Order>>> {
    let order = state.store.get(&id)?;
    Ok(ok(order))
}

/// GET /api/orders/invoice/:invoice_id - Fetch by customer-facing invoice
pub async fn get_by_invoice(
    State(state): State<ServerState>,
    Path(invoice_id): Path<String>,
) -> AppResult<Json<AppResponse<Order>>> {
    let order = state.store.get_by_invoice(&invoice_id)?;
    Ok(ok(order))
}

/// POST /api/orders/:id/payment - Re-issue a payment handle
///
/// For an order still awaiting payment after a gateway timeout or an
/// abandoned popup; conflicts if the order already left `unpaid/none`.
pub async fn payment_handle(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<PaymentHandle>>> {
    let handle = state.lifecycle.payment_handle(&id).await?;
    Ok(ok(handle))
}

/// POST /api/payments/callback - Asynchronous provider notification
///
/// Always acknowledges with 200 for well-formed-but-droppable input
/// (unknown order, duplicate txn, unknown status, malformed envelope)
/// to prevent provider retry storms. Only infrastructure failures
/// surface as errors, so the provider retries exactly when a retry can
/// help.
pub async fn payment_callback(
    State(state): State<ServerState>,
    Json(raw): Json<serde_json::Value>,
) -> AppResult<Json<AppResponse<&'static str>>> {
    let envelope: ProviderNotification = match serde_json::from_value(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed payment callback dropped");
            return Ok(ok("ignored"));
        }
    };

    let Some(notification) = payment::normalize(&envelope) else {
        return Ok(ok("ignored"));
    };

    match state.lifecycle.handle_payment_outcome(&notification)? {
        Some(_) => Ok(ok("applied")),
        None => Ok(ok("ignored")),
    }
}
