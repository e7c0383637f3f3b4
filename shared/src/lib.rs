//! Shared types for the Antrian walk-up ordering system
//!
//! Common types used by the edge server and clients: the order domain
//! model, lifecycle events, payment notification types and live-stream
//! frames.

pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use order::{
    LifecycleEvent, LifecycleEventType, Order, OrderItem, PaymentState, QueueState,
};
