//! Queue API Module
//!
//! Operator actions (promote, complete) and the public queue board
//! read model.

mod handler;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::ServerState;

/// Queue router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/queue", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::board))
        .route("/promote", post(handler::promote))
        .route("/complete", post(handler::complete))
}
