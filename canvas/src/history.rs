//! Local snapshot history for client-side undo/redo.
//!
//! A bounded list of full-raster snapshots plus a cursor pointing at the
//! snapshot currently on screen. Recording after an undo discards the
//! undone branch. Once the list is past capacity the oldest snapshot is
//! evicted, so the earliest states become unreachable.
//!
//! ```text
//! [S0]  record S1  ->  [S0, S1]  undo  ->  [S0*, S1]  record S2  ->  [S0, S2]
//! ```

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use frames::Snapshot;

use crate::consts::HISTORY_CAPACITY;
use crate::surface::{RasterSurface, paint_snapshot};

#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    entries: Vec<Snapshot>,
    cursor: usize,
    capacity: usize,
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl SnapshotHistory {
    /// Starts with a single blank snapshot. Capacity is at least 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { entries: vec![Snapshot::blank()], cursor: 0, capacity: capacity.max(1) }
    }

    /// Push a snapshot at the cursor, discarding anything after it.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(snapshot);
        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Capture the surface and push it.
    ///
    /// # Errors
    ///
    /// Propagates surface errors; the history is unchanged on failure.
    pub fn record<S: RasterSurface>(&mut self, surface: &mut S) -> Result<(), S::Error> {
        let snapshot = surface.capture_snapshot()?;
        self.push(snapshot);
        Ok(())
    }

    /// Capture the surface over the current snapshot, keeping the cursor
    /// and everything after it.
    ///
    /// # Errors
    ///
    /// Propagates surface errors; the history is unchanged on failure.
    pub fn amend<S: RasterSurface>(&mut self, surface: &mut S) -> Result<(), S::Error> {
        let snapshot = surface.capture_snapshot()?;
        if let Some(current) = self.entries.get_mut(self.cursor) {
            *current = snapshot;
        }
        Ok(())
    }

    /// Move the cursor back one step. Returns the snapshot now current.
    pub fn step_back(&mut self) -> Option<&Snapshot> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Move the cursor forward one step. Returns the snapshot now current.
    pub fn step_forward(&mut self) -> Option<&Snapshot> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    /// Step back and paint. Returns `false` at the oldest snapshot.
    ///
    /// # Errors
    ///
    /// Propagates surface errors.
    pub fn undo<S: RasterSurface>(&mut self, surface: &mut S) -> Result<bool, S::Error> {
        match self.step_back() {
            Some(snapshot) => paint_snapshot(surface, snapshot).map(|()| true),
            None => Ok(false),
        }
    }

    /// Step forward and paint. Returns `false` at the newest snapshot.
    ///
    /// # Errors
    ///
    /// Propagates surface errors.
    pub fn redo<S: RasterSurface>(&mut self, surface: &mut S) -> Result<bool, S::Error> {
        match self.step_forward() {
            Some(snapshot) => paint_snapshot(surface, snapshot).map(|()| true),
            None => Ok(false),
        }
    }

    /// Discard everything and start over from `snapshot`.
    pub fn reset(&mut self, snapshot: Snapshot) {
        self.entries.clear();
        self.entries.push(snapshot);
        self.cursor = 0;
    }

    #[must_use]
    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.cursor)
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }
}
