//! Room registry: membership, canvas snapshot, and operation log per room.
//!
//! DESIGN
//! ======
//! Every room is an independently locked `Arc<Mutex<Room>>`; the registry
//! map itself is only held long enough to look a room up or insert/evict
//! one. Unrelated rooms never contend on the same lock.
//!
//! LOCK ORDER
//! ==========
//! `rooms` map (briefly) -> a single `Room` -> `sessions` map. A room lock is
//! never held while acquiring the `rooms` map, and `sessions` is never held
//! while acquiring a room lock.
//!
//! LIFECYCLE
//! =========
//! Rooms are created on first join. When the last member leaves, the room is
//! marked closed under its own lock and then evicted from the map. A joiner
//! that races the eviction finds the closed flag, evicts the stale handle
//! itself, and retries against a fresh room.

use std::collections::HashMap;
use std::sync::Arc;

use frames::{Member, Point, Rgb, ServerEvent, SessionId, Snapshot, Stroke, sanitize_display_name};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, info, warn};

use super::oplog::{Inverse, Operation, OperationLog, OperationPayload};
use crate::config::RoomLimits;

// =============================================================================
// TYPES
// =============================================================================

/// The relay's handle on one connected participant.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    /// Outbound queue drained by the connection task.
    pub tx: mpsc::Sender<ServerEvent>,
}

/// Presence attributes of a room member.
#[derive(Debug, Clone)]
struct Presence {
    display_name: String,
    color: Rgb,
    joined_seq: u64,
    tx: mpsc::Sender<ServerEvent>,
}

/// Consistent membership + snapshot pair read under the room lock.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomState {
    pub members: Vec<Member>,
    pub canvas_snapshot: Snapshot,
}

/// Result of removing a session from its room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room: String,
    /// Members left behind. Empty means the room was deleted.
    pub remaining: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub state: RoomState,
    /// Set when joining moved the session out of a different room.
    pub departed: Option<Departure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RegistryStats {
    pub rooms: usize,
    pub users: usize,
}

// =============================================================================
// ROOM
// =============================================================================

/// Per-room live state. Only reachable through the registry's room lock.
#[derive(Debug)]
pub struct Room {
    name: String,
    limits: RoomLimits,
    members: HashMap<SessionId, Presence>,
    canvas_snapshot: Snapshot,
    log: OperationLog,
    /// Strokes still receiving points, keyed by author.
    open_strokes: HashMap<SessionId, Stroke>,
    next_join_seq: u64,
    closed: bool,
}

impl Room {
    fn new(name: &str, limits: RoomLimits) -> Self {
        Self {
            name: name.to_owned(),
            limits,
            members: HashMap::new(),
            canvas_snapshot: Snapshot::blank(),
            log: OperationLog::new(limits),
            open_strokes: HashMap::new(),
            next_join_seq: 0,
            closed: false,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn limits(&self) -> RoomLimits {
        self.limits
    }

    #[must_use]
    pub fn is_member(&self, session_id: &str) -> bool {
        self.members.contains_key(session_id)
    }

    /// Members in join order.
    #[must_use]
    pub fn member_list(&self) -> Vec<Member> {
        let mut entries: Vec<_> = self.members.iter().collect();
        entries.sort_by_key(|(_, p)| p.joined_seq);
        entries
            .into_iter()
            .map(|(id, p)| Member { session_id: id.clone(), display_name: p.display_name.clone(), color: p.color })
            .collect()
    }

    /// The member record for one session.
    #[must_use]
    pub fn member(&self, session_id: &str) -> Option<Member> {
        self.members.get(session_id).map(|p| Member {
            session_id: session_id.to_owned(),
            display_name: p.display_name.clone(),
            color: p.color,
        })
    }

    #[must_use]
    pub fn state(&self) -> RoomState {
        RoomState { members: self.member_list(), canvas_snapshot: self.canvas_snapshot.clone() }
    }

    pub fn set_canvas_snapshot(&mut self, snapshot: Snapshot) {
        self.canvas_snapshot = snapshot;
    }

    #[must_use]
    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    /// Apply one operation to the room. Returns `true` if the operation log
    /// changed.
    ///
    /// Stroke starts and points only feed the author's open stroke. A stroke
    /// end must carry the closed stroke (see [`Room::close_stroke`]). Clear
    /// also blanks the snapshot and drops every open stroke.
    pub fn record_operation(&mut self, op: Operation) -> bool {
        match op.payload {
            OperationPayload::StrokeStart(stroke) => {
                self.open_strokes.insert(op.author_id, stroke);
                false
            }
            OperationPayload::StrokePoint(point) => {
                self.extend_stroke(&op.author_id, point);
                false
            }
            OperationPayload::Undo => match self.log.undo(&op.author_id) {
                Some(Inverse::EraseStroke { seq, stroke }) => {
                    debug!(room = %op.room, author_id = %op.author_id, seq, points = stroke.points.len(), "room: stroke undone");
                    true
                }
                None => false,
            },
            OperationPayload::Redo => match self.log.redo(&op.author_id) {
                Some(entry) => {
                    let age_ms = op.timestamp_ms - entry.timestamp_ms;
                    debug!(room = %op.room, author_id = %op.author_id, seq = entry.seq, age_ms, "room: stroke redone");
                    true
                }
                None => false,
            },
            OperationPayload::Clear => {
                self.canvas_snapshot = Snapshot::blank();
                self.open_strokes.clear();
                self.log.append(op)
            }
            OperationPayload::StrokeEnd(_) => self.log.append(op),
        }
    }

    /// Close and hand back an author's open stroke.
    pub fn close_stroke(&mut self, author_id: &str) -> Option<Stroke> {
        self.open_strokes.remove(author_id)
    }

    /// Points past the per-stroke cap are relayed but not accumulated.
    fn extend_stroke(&mut self, author_id: &str, point: Point) {
        if let Some(stroke) = self.open_strokes.get_mut(author_id) {
            if stroke.points.len() < self.limits.max_points_per_stroke {
                stroke.points.push(point);
            }
        }
    }

    /// Queue an event to every member except `exclude`. Best-effort: a full or
    /// closed queue drops the event for that member only.
    ///
    /// Returns the number of members the event was queued for.
    pub fn broadcast(&self, event: &ServerEvent, exclude: Option<&str>) -> usize {
        let mut delivered = 0;
        for (session_id, presence) in &self.members {
            if exclude == Some(session_id.as_str()) {
                continue;
            }
            if enqueue(&presence.tx, session_id, event.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Add or refresh a member. The joiner's `room-joined` is queued before
    /// peers hear about the join, and both happen under the room lock, so the
    /// snapshot always precedes live events on the joiner's queue.
    fn admit(&mut self, session: &Session, display_name: String, color: Rgb) -> RoomState {
        let joined_seq = if let Some(existing) = self.members.get(&session.id) {
            existing.joined_seq
        } else {
            self.next_join_seq += 1;
            self.next_join_seq
        };
        self.members
            .insert(session.id.clone(), Presence { display_name, color, joined_seq, tx: session.tx.clone() });

        let state = self.state();
        let joined = ServerEvent::RoomJoined {
            room: self.name.clone(),
            session_id: session.id.clone(),
            members: state.members.clone(),
            canvas_snapshot: state.canvas_snapshot.clone(),
        };
        if session.tx.try_send(joined).is_err() {
            warn!(session_id = %session.id, room = %self.name, "registry: could not queue room-joined");
        }

        if let Some(member) = self.member(&session.id) {
            let notice = ServerEvent::UserJoined { member, members: state.members.clone() };
            self.broadcast(&notice, Some(&session.id));
        }
        state
    }

    /// Remove a member and tell the rest. Marks the room closed when empty.
    fn remove(&mut self, session_id: &str) -> Option<Vec<Member>> {
        self.members.remove(session_id)?;
        self.open_strokes.remove(session_id);
        self.log.drop_redo(session_id);

        let remaining = self.member_list();
        if remaining.is_empty() {
            self.closed = true;
        } else {
            let notice = ServerEvent::UserLeft { session_id: session_id.to_owned(), members: remaining.clone() };
            self.broadcast(&notice, None);
        }
        Some(remaining)
    }
}

fn enqueue(tx: &mpsc::Sender<ServerEvent>, session_id: &str, event: ServerEvent) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            debug!(%session_id, kind = event.kind(), "registry: client queue full, dropping event");
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Debug)]
pub struct RoomRegistry {
    limits: RoomLimits,
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
    /// Every connected session and the room it currently occupies.
    sessions: RwLock<HashMap<SessionId, Option<String>>>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new(limits: RoomLimits) -> Self {
        Self { limits, rooms: RwLock::new(HashMap::new()), sessions: RwLock::new(HashMap::new()) }
    }

    /// Register a freshly connected session.
    pub async fn connect(&self, session: &Session) {
        self.sessions.write().await.entry(session.id.clone()).or_insert(None);
    }

    /// Forget a session entirely, leaving its room first. Idempotent.
    pub async fn disconnect(&self, session_id: &str) -> Option<Departure> {
        let departure = self.leave(session_id).await;
        self.sessions.write().await.remove(session_id);
        departure
    }

    /// Join a room, leaving any other room first. Creates the room if absent.
    pub async fn join(&self, session: &Session, room_name: &str, display_name: &str, color: Rgb) -> JoinOutcome {
        let display_name = sanitize_display_name(display_name);

        let previous = self.room_of(&session.id).await;
        let departed = match previous {
            Some(prev) if prev != room_name => self.leave(&session.id).await,
            _ => None,
        };

        loop {
            let room = self.get_or_create(room_name).await;
            let mut guard = room.lock().await;
            if guard.closed {
                drop(guard);
                self.evict(room_name, &room).await;
                continue;
            }

            let state = guard.admit(session, display_name.clone(), color);
            self.sessions.write().await.insert(session.id.clone(), Some(room_name.to_owned()));
            drop(guard);

            info!(session_id = %session.id, room = %room_name, members = state.members.len(), "registry: joined");
            return JoinOutcome { state, departed };
        }
    }

    /// Remove a session from whatever room it occupies. Deletes the room when
    /// it becomes empty. `None` means the session had no room.
    pub async fn leave(&self, session_id: &str) -> Option<Departure> {
        let room_name = {
            let mut sessions = self.sessions.write().await;
            sessions.get_mut(session_id)?.take()?
        };

        let room = self.room(&room_name).await?;
        let mut guard = room.lock().await;
        let remaining = guard.remove(session_id)?;
        let closed = guard.closed;
        drop(guard);

        if closed {
            self.evict(&room_name, &room).await;
            info!(%session_id, room = %room_name, "registry: room closed");
        } else {
            info!(%session_id, room = %room_name, members = remaining.len(), "registry: left");
        }
        Some(Departure { room: room_name, remaining })
    }

    /// Consistent membership + snapshot for a room.
    pub async fn current_state(&self, room_name: &str) -> Option<RoomState> {
        let room = self.room(room_name).await?;
        let guard = room.lock().await;
        Some(guard.state())
    }

    /// Room the session currently occupies.
    pub async fn room_of(&self, session_id: &str) -> Option<String> {
        self.sessions.read().await.get(session_id).cloned().flatten()
    }

    /// Handle on a live room.
    pub async fn room(&self, room_name: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(room_name).cloned()
    }

    pub async fn stats(&self) -> RegistryStats {
        let rooms = self.rooms.read().await.len();
        let users = self.sessions.read().await.len();
        RegistryStats { rooms, users }
    }

    async fn get_or_create(&self, room_name: &str) -> Arc<Mutex<Room>> {
        if let Some(room) = self.room(room_name).await {
            return room;
        }
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_name.to_owned())
            .or_insert_with(|| {
                debug!(room = %room_name, "registry: room created");
                Arc::new(Mutex::new(Room::new(room_name, self.limits)))
            })
            .clone()
    }

    /// Remove `room` from the map if it is still the registered handle.
    async fn evict(&self, room_name: &str, room: &Arc<Mutex<Room>>) {
        let mut rooms = self.rooms.write().await;
        if rooms.get(room_name).is_some_and(|current| Arc::ptr_eq(current, room)) {
            rooms.remove(room_name);
        }
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
