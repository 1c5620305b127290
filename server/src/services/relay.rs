//! Broadcast relay: routes inbound events to the other members of the
//! sender's room.
//!
//! DESIGN
//! ======
//! `relay` is the single entry point for decoded client events. It checks
//! the event shape, resolves the sender's current room, rejects events that
//! claim a different room, and then applies the event under that room's lock:
//! stroke and cursor traffic is fanned out to peers, closing events are also
//! recorded in the operation log, and undo/redo broadcast the resulting
//! active stroke set so every member can repaint.
//!
//! Stroke, cursor, and clear events are never echoed back to their sender.
//! A sender receives its own `undo`/`redo` answer (its local raster may
//! predate peers' strokes), the `room-joined` handshake, and the
//! `room-state` resync answer.
//!
//! ERROR HANDLING
//! ==============
//! Every rejection is a [`DropReason`]. Callers log it at debug level and
//! move on; nothing here is fatal to the connection.

use frames::{ClientEvent, EventError, Point, ServerEvent, Stroke, clamp_width};
use tracing::debug;

use super::oplog::{Operation, OperationPayload};
use super::registry::{Room, RoomRegistry, Session};
use crate::error::ErrorCode;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DropReason {
    #[error("malformed event: {0}")]
    Malformed(#[from] EventError),
    #[error("session is not in a room")]
    NotInRoom,
    #[error("event targets room '{declared}' but sender is in '{current}'")]
    RoomMismatch { declared: String, current: String },
    #[error("room '{0}' no longer exists or sender is no longer a member")]
    StaleRoom(String),
    #[error("stroke-end without an open stroke")]
    NoOpenStroke,
    #[error("snapshot of {size} bytes exceeds limit of {limit}")]
    SnapshotTooLarge { size: usize, limit: usize },
}

impl ErrorCode for DropReason {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "E_MALFORMED",
            Self::NotInRoom => "E_NOT_IN_ROOM",
            Self::RoomMismatch { .. } => "E_ROOM_MISMATCH",
            Self::StaleRoom(_) => "E_STALE_ROOM",
            Self::NoOpenStroke => "E_NO_OPEN_STROKE",
            Self::SnapshotTooLarge { .. } => "E_SNAPSHOT_TOO_LARGE",
        }
    }
}

/// What happened to an accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    /// Sessions the resulting event was queued for.
    pub recipients: usize,
}

impl Delivery {
    fn to(recipients: usize) -> Self {
        Self { recipients }
    }
}

// =============================================================================
// RELAY
// =============================================================================

/// Apply one client event on behalf of `session`.
///
/// # Errors
///
/// Returns a [`DropReason`] when the event is rejected without touching
/// room state.
pub async fn relay(registry: &RoomRegistry, session: &Session, event: ClientEvent) -> Result<Delivery, DropReason> {
    event.validate()?;

    match event {
        ClientEvent::JoinRoom { room, display_name, color } => {
            let outcome = registry.join(session, &room, &display_name, color).await;
            if let Some(departed) = &outcome.departed {
                debug!(session_id = %session.id, from = %departed.room, to = %room, "relay: switched rooms");
            }
            Ok(Delivery::to(outcome.state.members.len().saturating_sub(1)))
        }
        ClientEvent::LeaveRoom => {
            let departure = registry.leave(&session.id).await.ok_or(DropReason::NotInRoom)?;
            Ok(Delivery::to(departure.remaining.len()))
        }
        ClientEvent::RequestState { .. } => request_state(registry, session, &event).await,
        event => relay_in_room(registry, session, event).await,
    }
}

/// The sender's current room, provided the event targets it.
async fn current_room(registry: &RoomRegistry, session: &Session, event: &ClientEvent) -> Result<String, DropReason> {
    let current = registry.room_of(&session.id).await.ok_or(DropReason::NotInRoom)?;
    let declared = event.room().unwrap_or_default();
    if declared != current {
        return Err(DropReason::RoomMismatch { declared: declared.to_owned(), current });
    }
    Ok(current)
}

/// Answer a resync request with a consistent membership + snapshot read.
async fn request_state(registry: &RoomRegistry, session: &Session, event: &ClientEvent) -> Result<Delivery, DropReason> {
    let current = current_room(registry, session, event).await?;
    let state = registry
        .current_state(&current)
        .await
        .ok_or_else(|| DropReason::StaleRoom(current.clone()))?;
    let reply = ServerEvent::RoomState { room: current, members: state.members, canvas_snapshot: state.canvas_snapshot };
    Ok(Delivery::to(usize::from(session.tx.try_send(reply).is_ok())))
}

async fn relay_in_room(registry: &RoomRegistry, session: &Session, event: ClientEvent) -> Result<Delivery, DropReason> {
    let current = current_room(registry, session, &event).await?;

    let handle = registry
        .room(&current)
        .await
        .ok_or_else(|| DropReason::StaleRoom(current.clone()))?;
    let mut room = handle.lock().await;
    if !room.is_member(&session.id) {
        return Err(DropReason::StaleRoom(current));
    }

    apply(&mut room, session, event)
}

/// Apply a room-scoped event while holding the room lock.
fn apply(room: &mut Room, session: &Session, event: ClientEvent) -> Result<Delivery, DropReason> {
    let sender = session.id.as_str();

    match event {
        ClientEvent::StrokeStart { room: name, x, y, tool, color, width } => {
            let width = clamp_width(width);
            let stroke = Stroke::begin(sender, tool, color, width, Point::new(x, y));
            room.record_operation(Operation::new(sender, name, OperationPayload::StrokeStart(stroke)));
            Ok(peers(room, sender, ServerEvent::StrokeStart { session_id: sender.to_owned(), x, y, tool, color, width }))
        }
        ClientEvent::StrokePoint { room: name, x, y } => {
            room.record_operation(Operation::new(sender, name, OperationPayload::StrokePoint(Point::new(x, y))));
            Ok(peers(room, sender, ServerEvent::StrokePoint { session_id: sender.to_owned(), x, y }))
        }
        ClientEvent::StrokeEnd { room: name } => {
            let stroke = room.close_stroke(sender).ok_or(DropReason::NoOpenStroke)?;
            room.record_operation(Operation::new(sender, name, OperationPayload::StrokeEnd(stroke)));
            Ok(peers(room, sender, ServerEvent::StrokeEnd { session_id: sender.to_owned() }))
        }
        ClientEvent::CursorMove { x, y, .. } => {
            let Some(member) = room.member(sender) else {
                return Err(DropReason::StaleRoom(room.name().to_owned()));
            };
            Ok(peers(
                room,
                sender,
                ServerEvent::CursorMove { session_id: member.session_id, display_name: member.display_name, color: member.color, x, y },
            ))
        }
        ClientEvent::Undo { room: name } => {
            if !room.record_operation(Operation::new(sender, name, OperationPayload::Undo)) {
                debug!(session_id = %sender, room = %room.name(), "relay: nothing to undo");
                return Ok(Delivery::default());
            }
            let strokes = room.log().active_strokes();
            Ok(everyone(room, ServerEvent::Undo { session_id: sender.to_owned(), strokes }))
        }
        ClientEvent::Redo { room: name } => {
            if !room.record_operation(Operation::new(sender, name, OperationPayload::Redo)) {
                debug!(session_id = %sender, room = %room.name(), "relay: nothing to redo");
                return Ok(Delivery::default());
            }
            let strokes = room.log().active_strokes();
            Ok(everyone(room, ServerEvent::Redo { session_id: sender.to_owned(), strokes }))
        }
        ClientEvent::ClearCanvas { room: name } => {
            room.record_operation(Operation::new(sender, name, OperationPayload::Clear));
            Ok(peers(room, sender, ServerEvent::CanvasCleared { session_id: sender.to_owned() }))
        }
        ClientEvent::SnapshotUpdate { snapshot, .. } => {
            let limit = room.limits().max_snapshot_bytes;
            if snapshot.byte_len() > limit {
                return Err(DropReason::SnapshotTooLarge { size: snapshot.byte_len(), limit });
            }
            room.set_canvas_snapshot(snapshot);
            Ok(Delivery::default())
        }
        ClientEvent::JoinRoom { .. } | ClientEvent::LeaveRoom | ClientEvent::RequestState { .. } => Ok(Delivery::default()),
    }
}

/// Fan an event out to everyone in the room except the sender.
fn peers(room: &Room, sender: &str, event: ServerEvent) -> Delivery {
    Delivery::to(room.broadcast(&event, Some(sender)))
}

/// Fan an event out to the whole room, sender included.
fn everyone(room: &Room, event: ServerEvent) -> Delivery {
    Delivery::to(room.broadcast(&event, None))
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
