//! Shared event model and codecs for the realtime sketch relay.
//!
//! This crate owns the wire representation used by both `server` and
//! `canvas`. Events are closed tagged enums: adding a kind is a
//! compile-time-checked change on both ends. The JSON form is what text
//! websocket frames carry; [`codec`] wraps the same JSON shape in a protobuf
//! envelope for binary frames.

pub mod codec;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use codec::{CodecError, decode_binary, decode_text, encode_binary, encode_text};

/// Longest accepted room name, in characters.
pub const MAX_ROOM_NAME_LEN: usize = 64;

/// Longest display name kept; longer names are truncated.
pub const MAX_DISPLAY_NAME_LEN: usize = 32;

/// Brush width bounds. Out-of-range widths are clamped, not rejected.
pub const MIN_STROKE_WIDTH: f64 = 1.0;
pub const MAX_STROKE_WIDTH: f64 = 100.0;

/// Opaque per-connection session identifier (server-assigned UUID string).
pub type SessionId = String;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A point in canvas-surface coordinates (after device-pixel normalization).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// 24-bit color. Serialized as a `#rrggbb` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb { r: 0xff, g: 0xff, b: 0xff };
    pub const INK: Rgb = Rgb { r: 0x33, g: 0x33, b: 0x44 };

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}': expected #rrggbb")]
pub struct ColorParseError(pub String);

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ColorParseError(s.to_owned());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).map_err(|_| invalid());
        Ok(Self { r: channel(0..2)?, g: channel(2..4)?, b: channel(4..6)? })
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Drawing tool attached to a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Brush,
    /// Paints in the background color.
    Eraser,
}

/// One continuous pointer gesture.
///
/// Invariant: a stroke that exists has at least one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub author_id: SessionId,
    pub tool: Tool,
    pub color: Rgb,
    pub width: f64,
    pub points: Vec<Point>,
}

impl Stroke {
    /// Start a stroke at its first point.
    #[must_use]
    pub fn begin(author_id: impl Into<SessionId>, tool: Tool, color: Rgb, width: f64, first: Point) -> Self {
        Self { author_id: author_id.into(), tool, color, width, points: vec![first] }
    }

    /// Color actually painted: erasers paint `background`.
    #[must_use]
    pub fn ink(&self, background: Rgb) -> Rgb {
        match self.tool {
            Tool::Brush => self.color,
            Tool::Eraser => background,
        }
    }
}

/// A room member as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub session_id: SessionId,
    pub display_name: String,
    pub color: Rgb,
}

/// Opaque full-raster capture of a canvas (a data URL in the browser).
///
/// The empty string is the blank canvas.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(String);

impl Snapshot {
    #[must_use]
    pub fn blank() -> Self {
        Self(String::new())
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }

    /// Size of the encoded raster in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Snapshot {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// =============================================================================
// CLIENT EVENTS
// =============================================================================

/// Events a client sends to the relay.
///
/// Room-scoped events declare the room they target; the relay drops any
/// whose room does not match the sender's current membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinRoom { room: String, display_name: String, color: Rgb },
    LeaveRoom,
    StrokeStart { room: String, x: f64, y: f64, tool: Tool, color: Rgb, width: f64 },
    StrokePoint { room: String, x: f64, y: f64 },
    StrokeEnd { room: String },
    CursorMove { room: String, x: f64, y: f64 },
    Undo { room: String },
    Redo { room: String },
    ClearCanvas { room: String },
    /// Replace the room's late-join snapshot. Not relayed to peers.
    SnapshotUpdate { room: String, snapshot: Snapshot },
    /// Ask for a `room-state` resync of membership and snapshot.
    RequestState { room: String },
}

/// Why an inbound event was rejected before touching room state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("room name is empty")]
    EmptyRoom,
    #[error("room name exceeds 64 characters")]
    RoomTooLong,
    #[error("coordinate or width is not finite")]
    NonFinite,
}

impl ClientEvent {
    /// Wire name of this event kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::LeaveRoom => "leave-room",
            Self::StrokeStart { .. } => "stroke-start",
            Self::StrokePoint { .. } => "stroke-point",
            Self::StrokeEnd { .. } => "stroke-end",
            Self::CursorMove { .. } => "cursor-move",
            Self::Undo { .. } => "undo",
            Self::Redo { .. } => "redo",
            Self::ClearCanvas { .. } => "clear-canvas",
            Self::SnapshotUpdate { .. } => "snapshot-update",
            Self::RequestState { .. } => "request-state",
        }
    }

    /// Room this event targets. `None` only for `leave-room`.
    #[must_use]
    pub fn room(&self) -> Option<&str> {
        match self {
            Self::LeaveRoom => None,
            Self::JoinRoom { room, .. }
            | Self::StrokeStart { room, .. }
            | Self::StrokePoint { room, .. }
            | Self::StrokeEnd { room }
            | Self::CursorMove { room, .. }
            | Self::Undo { room }
            | Self::Redo { room }
            | Self::ClearCanvas { room }
            | Self::SnapshotUpdate { room, .. }
            | Self::RequestState { room } => Some(room),
        }
    }

    /// Structural checks applied at the relay boundary.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), EventError> {
        if let Some(room) = self.room() {
            if room.trim().is_empty() {
                return Err(EventError::EmptyRoom);
            }
            if room.chars().count() > MAX_ROOM_NAME_LEN {
                return Err(EventError::RoomTooLong);
            }
        }
        let finite = match self {
            Self::StrokeStart { x, y, width, .. } => x.is_finite() && y.is_finite() && width.is_finite(),
            Self::StrokePoint { x, y, .. } | Self::CursorMove { x, y, .. } => x.is_finite() && y.is_finite(),
            _ => true,
        };
        if !finite {
            return Err(EventError::NonFinite);
        }
        Ok(())
    }
}

/// Trim and truncate a display name; empty names become `"anonymous"`.
#[must_use]
pub fn sanitize_display_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return "anonymous".to_owned();
    }
    trimmed.chars().take(MAX_DISPLAY_NAME_LEN).collect()
}

/// Clamp a brush width into the accepted range.
#[must_use]
pub fn clamp_width(width: f64) -> f64 {
    width.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH)
}

// =============================================================================
// SERVER EVENTS
// =============================================================================

/// Events the relay sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Late-join handshake: sent to the joiner before any live traffic.
    RoomJoined { room: String, session_id: SessionId, members: Vec<Member>, canvas_snapshot: Snapshot },
    UserJoined { member: Member, members: Vec<Member> },
    UserLeft { session_id: SessionId, members: Vec<Member> },
    StrokeStart { session_id: SessionId, x: f64, y: f64, tool: Tool, color: Rgb, width: f64 },
    StrokePoint { session_id: SessionId, x: f64, y: f64 },
    StrokeEnd { session_id: SessionId },
    CursorMove { session_id: SessionId, display_name: String, color: Rgb, x: f64, y: f64 },
    /// The author retracted a stroke; `strokes` is the room's remaining active set.
    Undo { session_id: SessionId, strokes: Vec<Stroke> },
    /// The author reapplied a stroke; `strokes` is the room's resulting active set.
    Redo { session_id: SessionId, strokes: Vec<Stroke> },
    CanvasCleared { session_id: SessionId },
    /// Resync answer to `request-state`.
    RoomState { room: String, members: Vec<Member>, canvas_snapshot: Snapshot },
}

impl ServerEvent {
    /// Wire name of this event kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RoomJoined { .. } => "room-joined",
            Self::UserJoined { .. } => "user-joined",
            Self::UserLeft { .. } => "user-left",
            Self::StrokeStart { .. } => "stroke-start",
            Self::StrokePoint { .. } => "stroke-point",
            Self::StrokeEnd { .. } => "stroke-end",
            Self::CursorMove { .. } => "cursor-move",
            Self::Undo { .. } => "undo",
            Self::Redo { .. } => "redo",
            Self::CanvasCleared { .. } => "canvas-cleared",
            Self::RoomState { .. } => "room-state",
        }
    }

    /// High-frequency events that are never logged per message.
    #[must_use]
    pub fn is_chatty(&self) -> bool {
        matches!(self, Self::StrokePoint { .. } | Self::CursorMove { .. })
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
