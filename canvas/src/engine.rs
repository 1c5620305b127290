//! Client engine: local input, remote events, and history on one surface.
//!
//! DESIGN
//! ======
//! [`EngineCore`] holds all client logic and is generic over
//! [`RasterSurface`], so it runs in native tests against a recorder.
//! [`Engine`] is the `wasm_bindgen` facade that binds it to a browser
//! canvas and speaks JSON frames to the host's websocket.
//!
//! Input methods return the [`ClientEvent`]s the host must send. Events are
//! produced only while in a room; drawing works locally either way.
//!
//! UNDO
//! ====
//! Local undo/redo restores pixel snapshots immediately and notifies the
//! relay. The relay answers every member, the sender included, with the
//! room's authoritative stroke list. Peers replay it as a new history entry.
//! The sender reconciles it over the entry its local step landed on, and
//! only then pushes a `snapshot-update`, so a local snapshot that predates a
//! peer's stroke never becomes the room's late-join raster. When the views
//! still drift, a `request-state` resync adopts the room snapshot and
//! restarts local history.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::HashMap;

use frames::{ClientEvent, Member, Point, Rgb, ServerEvent, SessionId, Stroke, Tool};
use js_sys::Array;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

use crate::capture::{CaptureState, CursorThrottle, StrokeCapture};
use crate::compositor::RemoteCompositor;
use crate::consts::{BACKGROUND, DEFAULT_BRUSH_WIDTH};
use crate::history::SnapshotHistory;
use crate::render::CanvasSurface;
use crate::surface::RasterSurface;
use crate::sync;
use crate::viewport::Viewport;

/// Drawing attributes applied to the next local stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    pub tool: Tool,
    pub color: Rgb,
    pub width: f64,
}

impl Default for Brush {
    fn default() -> Self {
        Self { tool: Tool::Brush, color: Rgb::INK, width: DEFAULT_BRUSH_WIDTH }
    }
}

/// Last known pointer position of a peer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCursor {
    pub display_name: String,
    pub color: Rgb,
    pub point: Point,
}

// =============================================================================
// CORE
// =============================================================================

/// Core engine state. Everything except the browser bindings.
#[derive(Debug)]
pub struct EngineCore<S> {
    surface: S,
    capture: StrokeCapture,
    cursor_throttle: CursorThrottle,
    compositor: RemoteCompositor,
    history: SnapshotHistory,
    room: Option<String>,
    session_id: Option<SessionId>,
    members: Vec<Member>,
    cursors: HashMap<SessionId, RemoteCursor>,
    brush: Brush,
}

impl<S: RasterSurface> EngineCore<S> {
    #[must_use]
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            capture: StrokeCapture::new(),
            cursor_throttle: CursorThrottle::default(),
            compositor: RemoteCompositor::default(),
            history: SnapshotHistory::default(),
            room: None,
            session_id: None,
            members: Vec::new(),
            cursors: HashMap::new(),
            brush: Brush::default(),
        }
    }

    // --- Room lifecycle ---

    /// Ask to join `room`. State arrives with the `room-joined` reply.
    #[must_use]
    pub fn join(&self, room: &str, display_name: &str, color: Rgb) -> ClientEvent {
        ClientEvent::JoinRoom { room: room.to_owned(), display_name: display_name.to_owned(), color }
    }

    /// Leave the current room and forget its presence state.
    pub fn leave(&mut self) -> Option<ClientEvent> {
        self.room.take()?;
        self.members.clear();
        self.cursors.clear();
        self.compositor.clear();
        self.capture.cancel();
        Some(ClientEvent::LeaveRoom)
    }

    // --- Brush ---

    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    // --- Local input (surface coordinates) ---

    /// Open a local stroke at `point`.
    pub fn pointer_down(&mut self, point: Point) -> Vec<ClientEvent> {
        let Brush { tool, color, width } = self.brush;
        let author = self.session_id.clone().unwrap_or_default();
        if !self.capture.begin(Stroke::begin(author, tool, color, width, point)) {
            return Vec::new();
        }
        self.room_event(|room| ClientEvent::StrokeStart { room, x: point.x, y: point.y, tool, color, width })
            .into_iter()
            .collect()
    }

    /// Extend the open stroke and maybe report the cursor.
    ///
    /// # Errors
    ///
    /// Propagates surface errors.
    pub fn pointer_move(&mut self, point: Point, now_ms: f64) -> Result<Vec<ClientEvent>, S::Error> {
        let mut events = Vec::new();
        if let Some((from, to)) = self.capture.extend(point) {
            if let CaptureState::Drawing(stroke) = self.capture.state() {
                self.surface.draw_segment(from, to, stroke.width, stroke.ink(BACKGROUND))?;
            }
            events.extend(self.room_event(|room| ClientEvent::StrokePoint { room, x: point.x, y: point.y }));
        }
        if self.room.is_some() && self.cursor_throttle.allow(now_ms) {
            events.extend(self.room_event(|room| ClientEvent::CursorMove { room, x: point.x, y: point.y }));
        }
        Ok(events)
    }

    /// Close the open stroke. Taps produce no events and no history entry.
    ///
    /// # Errors
    ///
    /// Propagates surface errors.
    pub fn pointer_up(&mut self) -> Result<Vec<ClientEvent>, S::Error> {
        if self.capture.finish().is_none() {
            return Ok(Vec::new());
        }
        self.history.record(&mut self.surface)?;
        let mut events: Vec<ClientEvent> = self.room_event(|room| ClientEvent::StrokeEnd { room }).into_iter().collect();
        events.extend(self.snapshot_update());
        Ok(events)
    }

    // --- Local history ---

    /// Step local history back. Notifies the room only if it moved.
    ///
    /// # Errors
    ///
    /// Propagates surface errors.
    pub fn undo(&mut self) -> Result<Vec<ClientEvent>, S::Error> {
        if !self.history.undo(&mut self.surface)? {
            return Ok(Vec::new());
        }
        Ok(self.room_event(|room| ClientEvent::Undo { room }).into_iter().collect())
    }

    /// Step local history forward. Notifies the room only if it moved.
    ///
    /// # Errors
    ///
    /// Propagates surface errors.
    pub fn redo(&mut self) -> Result<Vec<ClientEvent>, S::Error> {
        if !self.history.redo(&mut self.surface)? {
            return Ok(Vec::new());
        }
        Ok(self.room_event(|room| ClientEvent::Redo { room }).into_iter().collect())
    }

    /// Blank the canvas for everyone.
    ///
    /// # Errors
    ///
    /// Propagates surface errors.
    pub fn clear(&mut self) -> Result<Vec<ClientEvent>, S::Error> {
        self.surface.fill_all(BACKGROUND)?;
        self.compositor.clear();
        self.history.record(&mut self.surface)?;
        Ok(self.room_event(|room| ClientEvent::ClearCanvas { room }).into_iter().collect())
    }

    /// Ask the relay for the room's current state.
    #[must_use]
    pub fn request_state(&self) -> Option<ClientEvent> {
        self.room_event(|room| ClientEvent::RequestState { room })
    }

    // --- Relay events ---

    /// Apply one event from the relay. Returns the events to send back,
    /// which is only ever the `snapshot-update` that follows the relay's
    /// answer to our own undo/redo.
    ///
    /// # Errors
    ///
    /// Propagates surface errors.
    pub fn handle(&mut self, event: ServerEvent) -> Result<Vec<ClientEvent>, S::Error> {
        match event {
            ServerEvent::RoomJoined { room, session_id, members, canvas_snapshot } => {
                self.room = Some(room);
                self.session_id = Some(session_id);
                self.members = members;
                self.cursors.clear();
                self.compositor.clear();
                self.capture.cancel();
                sync::resync(&mut self.surface, &mut self.history, canvas_snapshot)?;
            }
            ServerEvent::RoomState { room, members, canvas_snapshot } => {
                if self.room.as_deref() != Some(room.as_str()) {
                    return Ok(Vec::new());
                }
                self.members = members;
                sync::resync(&mut self.surface, &mut self.history, canvas_snapshot)?;
                self.compositor.redraw_pending(&mut self.surface)?;
            }
            ServerEvent::UserJoined { members, .. } => {
                self.members = members;
            }
            ServerEvent::UserLeft { session_id, members } => {
                self.members = members;
                self.cursors.remove(&session_id);
                self.compositor.forget(&session_id);
            }
            ServerEvent::StrokeStart { session_id, x, y, tool, color, width } => {
                self.compositor.start(Stroke::begin(session_id, tool, color, width, Point::new(x, y)));
            }
            ServerEvent::StrokePoint { session_id, x, y } => {
                self.compositor.point(&mut self.surface, &session_id, Point::new(x, y))?;
            }
            ServerEvent::StrokeEnd { session_id } => {
                self.compositor.end(&mut self.surface, &session_id)?;
            }
            ServerEvent::CursorMove { session_id, display_name, color, x, y } => {
                self.cursors.insert(session_id, RemoteCursor { display_name, color, point: Point::new(x, y) });
            }
            ServerEvent::Undo { session_id, strokes } | ServerEvent::Redo { session_id, strokes } => {
                if self.session_id.as_deref() == Some(session_id.as_str()) {
                    sync::reconcile(&mut self.surface, &mut self.history, &mut self.compositor, &strokes)?;
                    return Ok(self.snapshot_update().into_iter().collect());
                }
                sync::replay(&mut self.surface, &mut self.history, &mut self.compositor, &strokes)?;
            }
            ServerEvent::CanvasCleared { .. } => {
                self.surface.fill_all(BACKGROUND)?;
                self.compositor.clear();
                self.history.record(&mut self.surface)?;
            }
        }
        Ok(Vec::new())
    }

    // --- Queries ---

    #[must_use]
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    #[must_use]
    pub fn cursors(&self) -> &HashMap<SessionId, RemoteCursor> {
        &self.cursors
    }

    #[must_use]
    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    #[must_use]
    pub fn compositor(&self) -> &RemoteCompositor {
        &self.compositor
    }

    #[must_use]
    pub fn brush(&self) -> Brush {
        self.brush
    }

    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.capture.is_drawing()
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    // --- Helpers ---

    fn room_event(&self, build: impl FnOnce(String) -> ClientEvent) -> Option<ClientEvent> {
        self.room.clone().map(build)
    }

    fn snapshot_update(&self) -> Option<ClientEvent> {
        let snapshot = self.history.current()?.clone();
        self.room_event(|room| ClientEvent::SnapshotUpdate { room, snapshot })
    }
}

// =============================================================================
// BROWSER FACADE
// =============================================================================

/// The canvas engine bound to a browser `<canvas>`.
///
/// Input methods take client (CSS) coordinates and return an array of JSON
/// frames for the host to send over its websocket.
#[wasm_bindgen]
pub struct Engine {
    core: EngineCore<CanvasSurface>,
    viewport: Viewport,
}

#[wasm_bindgen]
impl Engine {
    /// Bind to `canvas` and paint the blank background.
    ///
    /// # Errors
    ///
    /// Fails if the 2D context is unavailable.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement) -> Result<Engine, JsValue> {
        let viewport = Viewport::unscaled(f64::from(canvas.width()), f64::from(canvas.height()));
        let mut surface = CanvasSurface::new(canvas)?;
        surface.fill_all(BACKGROUND)?;
        Ok(Self { core: EngineCore::new(surface), viewport })
    }

    /// Update the element's on-page rect. Call on resize and scroll.
    pub fn set_viewport(&mut self, left: f64, top: f64, css_width: f64, css_height: f64) {
        let (surface_width, surface_height) = self.core.surface().size();
        self.viewport = Viewport { left, top, css_width, css_height, surface_width, surface_height };
    }

    /// # Errors
    ///
    /// Fails on an unknown tool or a color that is not `#rrggbb`.
    pub fn set_brush(&mut self, tool: &str, color: &str, width: f64) -> Result<(), JsValue> {
        let tool = match tool {
            "brush" => Tool::Brush,
            "eraser" => Tool::Eraser,
            other => return Err(JsValue::from_str(&format!("unknown tool '{other}'"))),
        };
        let color = parse_color(color)?;
        self.core.set_brush(Brush { tool, color, width: frames::clamp_width(width) });
        Ok(())
    }

    /// # Errors
    ///
    /// Fails on a malformed color.
    pub fn join(&mut self, room: &str, display_name: &str, color: &str) -> Result<Array, JsValue> {
        let color = parse_color(color)?;
        encode_frames([self.core.join(room, display_name, color)])
    }

    /// # Errors
    ///
    /// Fails if a frame cannot be encoded.
    pub fn leave(&mut self) -> Result<Array, JsValue> {
        encode_frames(self.core.leave())
    }

    /// # Errors
    ///
    /// Fails if a frame cannot be encoded.
    pub fn pointer_down(&mut self, client_x: f64, client_y: f64) -> Result<Array, JsValue> {
        let point = self.viewport.to_surface(client_x, client_y);
        encode_frames(self.core.pointer_down(point))
    }

    /// # Errors
    ///
    /// Fails on a drawing error or if a frame cannot be encoded.
    pub fn pointer_move(&mut self, client_x: f64, client_y: f64, now_ms: f64) -> Result<Array, JsValue> {
        let point = self.viewport.to_surface(client_x, client_y);
        encode_frames(self.core.pointer_move(point, now_ms)?)
    }

    /// Pointer released or left the canvas.
    ///
    /// # Errors
    ///
    /// Fails on a capture error or if a frame cannot be encoded.
    pub fn pointer_up(&mut self) -> Result<Array, JsValue> {
        encode_frames(self.core.pointer_up()?)
    }

    /// # Errors
    ///
    /// Fails on a drawing error or if a frame cannot be encoded.
    pub fn undo(&mut self) -> Result<Array, JsValue> {
        encode_frames(self.core.undo()?)
    }

    /// # Errors
    ///
    /// Fails on a drawing error or if a frame cannot be encoded.
    pub fn redo(&mut self) -> Result<Array, JsValue> {
        encode_frames(self.core.redo()?)
    }

    /// # Errors
    ///
    /// Fails on a drawing error or if a frame cannot be encoded.
    pub fn clear(&mut self) -> Result<Array, JsValue> {
        encode_frames(self.core.clear()?)
    }

    /// # Errors
    ///
    /// Fails if a frame cannot be encoded.
    pub fn request_state(&self) -> Result<Array, JsValue> {
        encode_frames(self.core.request_state())
    }

    /// Apply one JSON frame received from the relay. Returns frames to send
    /// back.
    ///
    /// # Errors
    ///
    /// Fails on an undecodable frame, a drawing error, or if a reply cannot
    /// be encoded.
    pub fn handle_message(&mut self, text: &str) -> Result<Array, JsValue> {
        let event: ServerEvent = frames::decode_text(text).map_err(|e| JsValue::from_str(&e.to_string()))?;
        encode_frames(self.core.handle(event)?)
    }

    /// Whether the undo button should be enabled.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.core.history().can_undo()
    }

    /// Whether the redo button should be enabled.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.core.history().can_redo()
    }

    /// Remote cursors as a JSON object keyed by session id, positioned in
    /// client (CSS) coordinates for the host's overlay.
    ///
    /// # Errors
    ///
    /// Fails if serialization fails.
    pub fn cursors_json(&self) -> Result<String, JsValue> {
        let cursors: HashMap<&str, RemoteCursor> = self
            .core
            .cursors()
            .iter()
            .map(|(id, cursor)| (id.as_str(), RemoteCursor { point: self.viewport.to_client(cursor.point), ..cursor.clone() }))
            .collect();
        serde_json::to_string(&cursors).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Room members as a JSON array.
    ///
    /// # Errors
    ///
    /// Fails if serialization fails.
    pub fn members_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.core.members()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.core.session_id().map(str::to_owned)
    }

    #[must_use]
    pub fn room(&self) -> Option<String> {
        self.core.room().map(str::to_owned)
    }
}

fn parse_color(color: &str) -> Result<Rgb, JsValue> {
    color.parse().map_err(|e: frames::ColorParseError| JsValue::from_str(&e.to_string()))
}

fn encode_frames(events: impl IntoIterator<Item = ClientEvent>) -> Result<Array, JsValue> {
    let out = Array::new();
    for event in events {
        let json = frames::encode_text(&event).map_err(|e| JsValue::from_str(&e.to_string()))?;
        out.push(&JsValue::from_str(&json));
    }
    Ok(out)
}
