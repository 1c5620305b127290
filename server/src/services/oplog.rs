//! Operation log: per-room record of closed operations and per-author undo/redo.
//!
//! DESIGN
//! ======
//! Only closing operations are kept: a finished stroke becomes one entry, a
//! clear empties the log. Stroke starts and points are relayed but never
//! logged, so the log grows with stroke count rather than point count.
//!
//! Undo is scoped to the author. `undo` removes the author's newest active
//! entry and parks it on that author's redo stack; `redo` puts it back at its
//! original position (entries are ordered by `seq`), so undo immediately
//! followed by redo restores the exact previous log. Any new closed operation
//! by the author empties their redo stack.
//!
//! CAPACITY
//! ========
//! The active log is trimmed to its newest `trim_to` entries once it exceeds
//! `max_entries`. Redo stacks drop their oldest entry past `redo_max_depth`.
//! Eviction is silent; it never surfaces as an error.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use frames::{Point, SessionId, Stroke};

use crate::config::RoomLimits;

// =============================================================================
// TYPES
// =============================================================================

/// What an operation did.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationPayload {
    StrokeStart(Stroke),
    StrokePoint(Point),
    StrokeEnd(Stroke),
    Clear,
    Undo,
    Redo,
}

/// One event as received by the relay, stamped with server arrival time.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub author_id: SessionId,
    pub room: String,
    pub timestamp_ms: i64,
    pub payload: OperationPayload,
}

impl Operation {
    #[must_use]
    pub fn new(author_id: impl Into<SessionId>, room: impl Into<String>, payload: OperationPayload) -> Self {
        Self { author_id: author_id.into(), room: room.into(), timestamp_ms: now_ms(), payload }
    }

    /// Closing operations are the only ones the log retains.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        matches!(self.payload, OperationPayload::StrokeEnd(_) | OperationPayload::Clear)
    }
}

/// A closed stroke in the active log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Arrival sequence within the room. Strictly increasing.
    pub seq: u64,
    pub author_id: SessionId,
    pub timestamp_ms: i64,
    pub stroke: Stroke,
}

/// Instruction returned by [`OperationLog::undo`] describing how to revert.
#[derive(Debug, Clone, PartialEq)]
pub enum Inverse {
    /// Remove this stroke from the rendered canvas.
    EraseStroke { seq: u64, stroke: Stroke },
}

// =============================================================================
// LOG
// =============================================================================

#[derive(Debug)]
pub struct OperationLog {
    limits: RoomLimits,
    active: Vec<LogEntry>,
    redo: HashMap<SessionId, Vec<LogEntry>>,
    next_seq: u64,
}

impl OperationLog {
    #[must_use]
    pub fn new(limits: RoomLimits) -> Self {
        Self { limits, active: Vec::new(), redo: HashMap::new(), next_seq: 0 }
    }

    /// Apply an operation. Returns `true` if it changed the log.
    ///
    /// Non-closing operations and strokes without points are ignored.
    pub fn append(&mut self, op: Operation) -> bool {
        if !op.is_closing() {
            return false;
        }
        match op.payload {
            OperationPayload::StrokeEnd(stroke) => {
                if stroke.points.is_empty() {
                    return false;
                }
                self.next_seq += 1;
                self.redo.remove(&op.author_id);
                self.active.push(LogEntry {
                    seq: self.next_seq,
                    author_id: op.author_id,
                    timestamp_ms: op.timestamp_ms,
                    stroke,
                });
                self.enforce_cap();
                true
            }
            OperationPayload::Clear => {
                self.truncate();
                true
            }
            OperationPayload::StrokeStart(_)
            | OperationPayload::StrokePoint(_)
            | OperationPayload::Undo
            | OperationPayload::Redo => false,
        }
    }

    /// Retract the author's newest active entry.
    pub fn undo(&mut self, author_id: &str) -> Option<Inverse> {
        let idx = self.active.iter().rposition(|e| e.author_id == author_id)?;
        let entry = self.active.remove(idx);
        let inverse = Inverse::EraseStroke { seq: entry.seq, stroke: entry.stroke.clone() };

        let stack = self.redo.entry(entry.author_id.clone()).or_default();
        stack.push(entry);
        if stack.len() > self.limits.redo_max_depth {
            let excess = stack.len() - self.limits.redo_max_depth;
            stack.drain(..excess);
        }
        Some(inverse)
    }

    /// Reapply the author's most recently undone entry at its original position.
    pub fn redo(&mut self, author_id: &str) -> Option<LogEntry> {
        let stack = self.redo.get_mut(author_id)?;
        let entry = stack.pop()?;
        if stack.is_empty() {
            self.redo.remove(author_id);
        }

        let idx = self.active.partition_point(|e| e.seq < entry.seq);
        self.active.insert(idx, entry.clone());
        self.enforce_cap();
        Some(entry)
    }

    /// Drop every entry and every redo stack.
    pub fn truncate(&mut self) {
        self.active.clear();
        self.redo.clear();
    }

    /// Forget an author's redo stack (the author left the room).
    pub fn drop_redo(&mut self, author_id: &str) {
        self.redo.remove(author_id);
    }

    /// Active strokes in arrival order.
    #[must_use]
    pub fn active_strokes(&self) -> Vec<Stroke> {
        self.active.iter().map(|e| e.stroke.clone()).collect()
    }

    #[cfg(test)]
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.active
    }

    #[cfg(test)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    #[cfg(test)]
    #[must_use]
    pub fn redo_depth(&self, author_id: &str) -> usize {
        self.redo.get(author_id).map_or(0, Vec::len)
    }

    fn enforce_cap(&mut self) {
        if self.active.len() > self.limits.oplog_max_entries {
            let excess = self.active.len() - self.limits.oplog_trim_to;
            self.active.drain(..excess);
        }
    }
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "oplog_test.rs"]
mod tests;
