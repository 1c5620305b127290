//! Reconciling the local raster with room-wide state.
//!
//! Two paths bring the local canvas in line with the room:
//!
//! - **Resync** (`room-joined`, `room-state`): paint the room's snapshot and
//!   restart local history from it. The snapshot is adopted as-is, not
//!   re-captured, so the history's base is byte-identical to the room's.
//! - **Replay** (peer `undo`/`redo`): the relay sends the full active stroke
//!   list. Repaint from background, put in-progress remote strokes back on
//!   top, and record the result as a new local history entry.
//! - **Reconcile** (the relay's answer to our own `undo`/`redo`): repaint the
//!   same way, but overwrite the snapshot the local step landed on instead
//!   of recording, so the local redo branch survives.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use frames::{Snapshot, Stroke};

use crate::compositor::RemoteCompositor;
use crate::history::SnapshotHistory;
use crate::surface::{RasterSurface, paint_snapshot, repaint};

/// Adopt a room snapshot as the new local baseline.
///
/// # Errors
///
/// Propagates surface errors.
pub fn resync<S: RasterSurface>(surface: &mut S, history: &mut SnapshotHistory, snapshot: Snapshot) -> Result<(), S::Error> {
    paint_snapshot(surface, &snapshot)?;
    history.reset(snapshot);
    Ok(())
}

/// Rebuild the raster from an authoritative stroke list.
///
/// # Errors
///
/// Propagates surface errors.
pub fn replay<S: RasterSurface>(
    surface: &mut S,
    history: &mut SnapshotHistory,
    compositor: &mut RemoteCompositor,
    strokes: &[Stroke],
) -> Result<(), S::Error> {
    repaint(surface, strokes)?;
    compositor.redraw_pending(surface)?;
    history.record(surface)
}

/// Rebuild the raster from an authoritative stroke list, amending the
/// current history entry in place.
///
/// # Errors
///
/// Propagates surface errors.
pub fn reconcile<S: RasterSurface>(
    surface: &mut S,
    history: &mut SnapshotHistory,
    compositor: &mut RemoteCompositor,
    strokes: &[Stroke],
) -> Result<(), S::Error> {
    repaint(surface, strokes)?;
    compositor.redraw_pending(surface)?;
    history.amend(surface)
}
