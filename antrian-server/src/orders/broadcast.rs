//! Event broadcasting - push-with-replay for queue observers
//!
//! ```text
//! LifecycleController ──publish()──► EventBroadcaster
//!                                        ├── ring buffer (bounded, by sequence)
//!                                        └── broadcast ──► kitchen screen
//!                                                      ──► queue board
//!                                                      ──► ...
//! ```
//!
//! Delivery is at-least-once and fire-and-forget relative to the state
//! transition: `publish` never blocks on observers. Each subscriber
//! holds a bounded broadcast backlog; when it falls behind, the oldest
//! entries are dropped and the receiver observes `Lagged`, at which
//! point the session layer resyncs it with a fresh snapshot. A
//! reconnecting observer hands in its last known sequence; if that
//! point has been evicted from the ring it is told to discard local
//! state and take a snapshot instead of trusting a partial replay.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use shared::order::LifecycleEvent;
use tokio::sync::broadcast;

/// Replay decision for a reconnecting subscriber
#[derive(Debug)]
pub enum Replay {
    /// Gap-free continuation from the subscriber's last known sequence
    Events(Vec<Arc<LifecycleEvent>>),
    /// The requested point is older than the retained window - the
    /// subscriber must discard and re-fetch the full snapshot.
    SnapshotRequired,
}

/// Bounded replay buffer + live fan-out
#[derive(Clone)]
pub struct EventBroadcaster {
    /// Recent events ordered by sequence
    ring: Arc<RwLock<VecDeque<Arc<LifecycleEvent>>>>,
    /// Ring capacity (events retained for replay)
    capacity: usize,
    live_tx: broadcast::Sender<Arc<LifecycleEvent>>,
}

impl EventBroadcaster {
    /// `ring_capacity` bounds replay history; `channel_capacity` bounds
    /// each subscriber's live backlog.
    pub fn new(ring_capacity: usize, channel_capacity: usize) -> Self {
        let (live_tx, _) = broadcast::channel(channel_capacity);
        Self {
            ring: Arc::new(RwLock::new(VecDeque::with_capacity(ring_capacity))),
            capacity: ring_capacity,
            live_tx,
        }
    }

    /// Publish one event to the ring and all live subscribers
    ///
    /// Sequence numbers are allocated inside the storage transaction,
    /// so concurrent publishers may arrive here slightly out of order;
    /// the ring keeps itself sorted so replay stays monotonic.
    pub fn publish(&self, event: LifecycleEvent) {
        let event = Arc::new(event);
        {
            let mut ring = self.ring.write();
            // Common case: append. Rare case: a lower sequence arrives
            // after a higher one committed-and-published first.
            let insert_at = ring
                .iter()
                .rposition(|e| e.sequence < event.sequence)
                .map(|i| i + 1)
                .unwrap_or(0);
            ring.insert(insert_at, Arc::clone(&event));
            while ring.len() > self.capacity {
                ring.pop_front();
            }
        }

        // No receivers is fine - the board may simply be offline
        let _ = self.live_tx.send(event);
    }

    /// Subscribe to the live stream
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LifecycleEvent>> {
        self.live_tx.subscribe()
    }

    /// Events after `last_known_sequence`, or the instruction to resync
    ///
    /// `last_known_sequence = 0` means a fresh subscriber; it gets a
    /// snapshot unless the ring still covers the very first event.
    pub fn replay_since(&self, last_known_sequence: u64) -> Replay {
        let ring = self.ring.read();

        let Some(oldest) = ring.front().map(|e| e.sequence) else {
            // Nothing buffered: replayable only if the subscriber is
            // already at the current head (nothing was ever published
            // or everything it knows is still valid).
            return Replay::Events(Vec::new());
        };

        // A gap between the subscriber's position and the oldest
        // retained event cannot be bridged by replay.
        if last_known_sequence + 1 < oldest {
            return Replay::SnapshotRequired;
        }

        Replay::Events(
            ring.iter()
                .filter(|e| e.sequence > last_known_sequence)
                .cloned()
                .collect(),
        )
    }

    /// Highest buffered sequence (0 when empty)
    pub fn head_sequence(&self) -> u64 {
        self.ring.read().back().map(|e| e.sequence).unwrap_or(0)
    }
}
