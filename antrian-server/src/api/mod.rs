//! HTTP API - routers and handlers
//!
//! | Prefix | Module | Purpose |
//! |--------|--------|---------|
//! | `/api/orders` | [`orders`] | Order creation, lookup, payment handle |
//! | `/api/payments` | [`orders`] | Provider callback |
//! | `/api/queue` | [`queue`] | Operator actions + queue board |
//! | `/api/live` | [`live`] | WebSocket live subscription |
//! | `/health` | [`health`] | Liveness probe |

pub mod health;
pub mod live;
pub mod orders;
pub mod queue;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Build the full application router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(orders::router())
        .merge(queue::router())
        .merge(live::router())
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
        // The queue board and customer screens are served from other
        // origins in deployment
        .layer(CorsLayer::permissive())
        .with_state(state)
}
