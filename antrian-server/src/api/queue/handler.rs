//! Queue API Handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use shared::order::Order;
use shared::util::now_millis;

use crate::core::ServerState;
use crate::utils::{ok, AppResponse, AppResult};

/// Query params for the queue board
#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    /// Window for showing recently completed orders (milliseconds).
    /// Defaults to the configured board window; day-boundary logic is
    /// a presentation concern and never lives in the engine.
    pub done_within_ms: Option<i64>,
}

/// GET /api/queue - Queue board read model
///
/// Waiting and in-preparation orders in admission order, followed by
/// orders completed within the window.
pub async fn board(
    State(state): State<ServerState>,
    Query(query): Query<BoardQuery>,
) -> AppResult<Json<AppResponse<Vec<Order>>>> {
    let window = query
        .done_within_ms
        .unwrap_or(state.config.board_done_window_ms);
    let orders = state.store.board_orders(window, now_millis())?;
    Ok(ok(orders))
}

/// POST /api/queue/promote - Promote the head of the waiting line
///
/// Empty result (not an error) when the line is empty or the slot is
/// occupied - "someone else already acted" is normal operation.
pub async fn promote(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Order>>> {
    match state.lifecycle.promote()? {
        Some(order) => Ok(ok(order)),
        None => Ok(Json(AppResponse {
            error: "ok".to_string(),
            message: "No eligible order".to_string(),
            data: None,
        })),
    }
}

/// Request body for completing the active order
#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    /// Explicit id of the order the operator believes is active. The
    /// controller rejects a mismatch, so a stale screen can never
    /// complete the wrong order.
    pub order_id: String,
}

/// POST /api/queue/complete - Complete the order in preparation
pub async fn complete(
    State(state): State<ServerState>,
    Json(request): Json<CompleteRequest>,
) -> AppResult<Json<AppResponse<Order>>> {
    let order = state.lifecycle.complete(&request.order_id)?;
    Ok(ok(order))
}
