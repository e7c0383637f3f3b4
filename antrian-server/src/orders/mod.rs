//! Order & queue lifecycle engine
//!
//! # Components
//!
//! - [`store::OrderStore`] - durable order records (redb), the single
//!   source of truth, mutated only through compare-and-swap
//! - [`sequencer::QueueSequencer`] - monotonic queue numbers and the
//!   mutually-exclusive preparation slot
//! - [`lifecycle::LifecycleController`] - the payment-gated state
//!   machine; sole writer of order state, emitter of lifecycle events
//! - [`broadcast::EventBroadcaster`] - bounded replay ring + live
//!   fan-out to queue observers

pub mod broadcast;
pub mod lifecycle;
pub mod sequencer;
pub mod store;

pub use broadcast::{EventBroadcaster, Replay};
pub use lifecycle::{LifecycleController, LifecycleError};
pub use sequencer::{QueueSequencer, SequencerError};
pub use store::{OrderStore, StoreError};
