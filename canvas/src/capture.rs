//! Stroke capture: the local pointer state machine.
//!
//! `idle -> drawing -> idle`. Pointer-down opens a stroke at its first point,
//! every move while drawing appends a point (no decimation, every move is
//! sent), and pointer-up/leave closes it. A closed stroke with a single point
//! is a tap and is suppressed so it never becomes an undoable entry.
//!
//! Cursor updates are throttled separately by [`CursorThrottle`], independent
//! of stroke state.

#[cfg(test)]
#[path = "capture_test.rs"]
mod capture_test;

use frames::{Point, Stroke};

use crate::consts::CURSOR_THROTTLE_MS;

/// Current gesture.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    /// A stroke is open and accumulating points.
    Drawing(Stroke),
}

#[derive(Debug, Default)]
pub struct StrokeCapture {
    state: CaptureState,
}

impl StrokeCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    #[must_use]
    pub fn is_drawing(&self) -> bool {
        matches!(self.state, CaptureState::Drawing(_))
    }

    /// Open a stroke. Returns `false` (and changes nothing) if one is
    /// already open.
    pub fn begin(&mut self, stroke: Stroke) -> bool {
        if self.is_drawing() {
            return false;
        }
        self.state = CaptureState::Drawing(stroke);
        true
    }

    /// Append a point. Returns the segment to draw, or `None` when idle.
    pub fn extend(&mut self, point: Point) -> Option<(Point, Point)> {
        let CaptureState::Drawing(stroke) = &mut self.state else {
            return None;
        };
        let last = stroke.points.last().copied().unwrap_or(point);
        stroke.points.push(point);
        Some((last, point))
    }

    /// Close the open stroke. Returns it only if it has more than one point.
    pub fn finish(&mut self) -> Option<Stroke> {
        match std::mem::take(&mut self.state) {
            CaptureState::Drawing(stroke) if stroke.points.len() > 1 => Some(stroke),
            CaptureState::Drawing(_) | CaptureState::Idle => None,
        }
    }

    /// Drop any open stroke without emitting it.
    pub fn cancel(&mut self) {
        self.state = CaptureState::Idle;
    }
}

/// Fixed-interval gate for cursor broadcasts.
#[derive(Debug, Clone, Copy)]
pub struct CursorThrottle {
    interval_ms: f64,
    last_sent_ms: Option<f64>,
}

impl Default for CursorThrottle {
    fn default() -> Self {
        Self::new(CURSOR_THROTTLE_MS)
    }
}

impl CursorThrottle {
    #[must_use]
    pub fn new(interval_ms: f64) -> Self {
        Self { interval_ms, last_sent_ms: None }
    }

    /// Whether a cursor update may be sent at `now_ms`. Records the send.
    pub fn allow(&mut self, now_ms: f64) -> bool {
        let due = self.last_sent_ms.is_none_or(|last| now_ms - last >= self.interval_ms);
        if due {
            self.last_sent_ms = Some(now_ms);
        }
        due
    }
}
