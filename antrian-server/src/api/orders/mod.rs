//! Order API Module
//!
//! Order creation and lookup plus the provider payment callback. All
//! state mutations go through the LifecycleController.

mod handler;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new()
        .nest("/api/orders", routes())
        // Provider callback lives outside the orders prefix
        .route("/api/payments/callback", post(handler::payment_callback))
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/payment", post(handler::payment_handle))
        .route("/invoice/{invoice_id}", get(handler::get_by_invoice))
}
