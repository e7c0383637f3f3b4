//! Live Subscription Module
//!
//! WebSocket endpoint streaming lifecycle frames to queue observers
//! (kitchen screen, public board).

mod handler;

use axum::{routing::get, Router};

use crate::core::ServerState;

/// Live subscription router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/live/ws", get(handler::ws))
}
