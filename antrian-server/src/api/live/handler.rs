//! Live subscription handler
//!
//! Protocol: the client connects with its last known sequence
//! (`?last_seq=0` for fresh). The server sends either a gap-free event
//! replay or a `resync` frame followed by a full snapshot, then keeps
//! streaming live events. Delivery is at-least-once; the client treats
//! already-seen sequence numbers as no-ops.
//!
//! A subscriber that falls behind its bounded backlog observes a lag
//! and is resynced in place with a fresh snapshot - transitions on the
//! server are never blocked by a slow observer.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;
use shared::order::LiveFrame;
use tokio::sync::broadcast::error::RecvError;

use crate::core::ServerState;
use crate::orders::Replay;

/// Query params for the live subscription
#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    /// Last event sequence the client has applied (0 = fresh)
    #[serde(default)]
    pub last_seq: u64,
}

/// GET /api/live/ws - Upgrade to the live stream
pub async fn ws(
    State(state): State<ServerState>,
    Query(query): Query<LiveQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, query.last_seq, socket))
}

async fn handle_socket(state: ServerState, last_seq: u64, mut socket: WebSocket) {
    // Subscribe before snapshotting: a transition racing the snapshot
    // shows up in both (idempotent on the client) instead of neither.
    let mut rx = state.broadcaster().subscribe();

    if !send_catch_up(&state, last_seq, &mut socket).await {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    // Clients only ever send pings/closes
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "Live subscriber socket error");
                        break;
                    }
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        let frame = LiveFrame::Event((*event).clone());
                        if !send_frame(&mut socket, &frame).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Live subscriber lagged, resyncing with snapshot");
                        if !send_catch_up(&state, u64::MAX, &mut socket).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}

/// Bring the subscriber up to current truth: replay when the buffer
/// still covers its position, otherwise resync + snapshot. Returns
/// `false` when the socket is gone.
///
/// `last_seq = u64::MAX` forces the snapshot path (used after a lag).
async fn send_catch_up(state: &ServerState, last_seq: u64, socket: &mut WebSocket) -> bool {
    let snapshot = match state.lifecycle.snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build snapshot for subscriber");
            return false;
        }
    };

    // Fresh subscribers (0) and lagged ones (MAX) always take the
    // snapshot path; resumers may replay instead.
    let resuming = last_seq != 0 && last_seq != u64::MAX;

    if resuming && last_seq >= snapshot.sequence {
        // Already at (or ahead of) the durable head - nothing to send
        return true;
    }

    // Replay is only trustworthy if it actually reaches the durable
    // head; an empty ring after a restart must not look like "nothing
    // happened".
    if resuming
        && let Replay::Events(events) = state.broadcaster().replay_since(last_seq)
        && events.last().map(|e| e.sequence) == Some(snapshot.sequence)
    {
        for event in events {
            let frame = LiveFrame::Event((*event).clone());
            if !send_frame(socket, &frame).await {
                return false;
            }
        }
        return true;
    }

    let resync = LiveFrame::Resync {
        last_sequence: snapshot.sequence,
    };
    if !send_frame(socket, &resync).await {
        return false;
    }
    send_frame(socket, &LiveFrame::Snapshot(snapshot)).await
}

async fn send_frame(socket: &mut WebSocket, frame: &LiveFrame) -> bool {
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize live frame");
            return false;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}
