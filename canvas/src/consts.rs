//! Shared numeric constants for the canvas crate.

use frames::Rgb;

// ── Remote strokes ──────────────────────────────────────────────

/// Render an in-progress remote stroke every Nth accumulated point.
pub const DECIMATION_FACTOR: usize = 3;

// ── Cursor ──────────────────────────────────────────────────────

/// Minimum interval between outgoing cursor updates, in milliseconds.
pub const CURSOR_THROTTLE_MS: f64 = 100.0;

// ── History ─────────────────────────────────────────────────────

/// Snapshots kept for local undo/redo before the oldest is evicted.
pub const HISTORY_CAPACITY: usize = 50;

// ── Brush ───────────────────────────────────────────────────────

/// Canvas background. Erasers paint with it and clears fill with it.
pub const BACKGROUND: Rgb = Rgb::WHITE;

/// Brush width used until the host picks one.
pub const DEFAULT_BRUSH_WIDTH: f64 = 4.0;
