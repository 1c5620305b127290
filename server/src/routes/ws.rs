//! WebSocket handler: bidirectional event relay.
//!
//! DESIGN
//! ======
//! On upgrade, assigns a session ID and enters a `select!` loop:
//! - Incoming client events -> decode -> `services::relay::relay`
//! - Events queued by room peers -> encode -> forward to client
//!
//! Clients may speak JSON text frames or protobuf binary frames. Outbound
//! events use whichever encoding the client used last (text until the first
//! inbound frame).
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade -> register session with the registry
//! 2. Client sends `join-room` -> `room-joined` handshake queued first
//! 3. Room traffic flows both ways
//! 4. Close or socket error -> registry disconnect (peers get `user-left`)

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::{ClientEvent, CodecError, ServerEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::services::registry::Session;
use crate::services::relay::relay;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Text,
    Binary,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4().to_string();

    // Per-connection queue for events fanned out by room peers.
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(state.config.client_queue_capacity);
    let session = Session { id: session_id, tx };
    state.registry.connect(&session).await;
    info!(session_id = %session.id, "ws: client connected");

    let mut encoding = Encoding::Text;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        encoding = Encoding::Text;
                        process_inbound(&state, &session, frames::decode_text(text.as_str())).await;
                    }
                    Message::Binary(bytes) => {
                        encoding = Encoding::Binary;
                        process_inbound(&state, &session, frames::decode_binary(&bytes)).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = rx.recv() => {
                if send_event(&mut socket, encoding, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(departure) = state.registry.disconnect(&session.id).await {
        debug!(session_id = %session.id, room = %departure.room, remaining = departure.remaining.len(), "ws: left room on disconnect");
    }
    info!(session_id = %session.id, "ws: client disconnected");
}

// =============================================================================
// EVENT DISPATCH
// =============================================================================

/// Relay one decoded inbound event. Malformed and rejected events are
/// dropped with a debug log; the client gets no error reply.
async fn process_inbound(state: &AppState, session: &Session, decoded: Result<ClientEvent, CodecError>) {
    let event = match decoded {
        Ok(event) => event,
        Err(e) => {
            debug!(session_id = %session.id, error = %e, "ws: malformed inbound event dropped");
            return;
        }
    };

    let kind = event.kind();
    match relay(&state.registry, session, event).await {
        Ok(delivery) => {
            if !matches!(kind, "stroke-point" | "cursor-move") {
                debug!(session_id = %session.id, kind, recipients = delivery.recipients, "ws: relayed");
            }
        }
        Err(reason) => {
            debug!(session_id = %session.id, kind, code = reason.error_code(), retryable = reason.retryable(), error = %reason, "ws: event dropped");
        }
    }
}

async fn send_event(socket: &mut WebSocket, encoding: Encoding, event: &ServerEvent) -> Result<(), ()> {
    let msg = match encoding {
        Encoding::Text => frames::encode_text(event).map(|json| Message::Text(json.into())),
        Encoding::Binary => frames::encode_binary(event).map(|bytes| Message::Binary(bytes.into())),
    };
    let msg = match msg {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, kind = event.kind(), "ws: failed to encode event, skipping");
            return Ok(());
        }
    };
    if !event.is_chatty() {
        debug!(kind = event.kind(), "ws: send event");
    }
    socket.send(msg).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
