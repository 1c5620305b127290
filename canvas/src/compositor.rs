//! Remote stroke compositor.
//!
//! Tracks one in-progress stroke per remote author and renders it as points
//! arrive. Rendering is decimated: the polyline is extended each time the
//! point count reaches a multiple of [`DECIMATION_FACTOR`], picking up from
//! the last rendered point so no segment is skipped. On `stroke-end` the
//! whole stroke is drawn again from its first point, which also restores any
//! prefix lost to a repaint while the stroke was open.
//!
//! Points for an author with no open stroke are ignored; a second
//! `stroke-start` from the same author replaces the first.

#[cfg(test)]
#[path = "compositor_test.rs"]
mod compositor_test;

use std::collections::HashMap;

use frames::{Point, SessionId, Stroke};

use crate::consts::DECIMATION_FACTOR;
use crate::surface::{RasterSurface, draw_points, draw_stroke};

#[derive(Debug, Clone, PartialEq)]
struct PendingStroke {
    stroke: Stroke,
    /// Index of the last point already on the surface.
    rendered: usize,
}

#[derive(Debug)]
pub struct RemoteCompositor {
    pending: HashMap<SessionId, PendingStroke>,
    factor: usize,
}

impl Default for RemoteCompositor {
    fn default() -> Self {
        Self::new(DECIMATION_FACTOR)
    }
}

impl RemoteCompositor {
    /// A factor of 0 is treated as 1 (render every point).
    #[must_use]
    pub fn new(factor: usize) -> Self {
        Self { pending: HashMap::new(), factor: factor.max(1) }
    }

    /// Open a stroke for `stroke.author_id`, replacing any open one.
    pub fn start(&mut self, stroke: Stroke) {
        self.pending.insert(stroke.author_id.clone(), PendingStroke { stroke, rendered: 0 });
    }

    /// Append a point and render if the decimation step is reached.
    ///
    /// # Errors
    ///
    /// Propagates surface errors.
    pub fn point<S: RasterSurface>(&mut self, surface: &mut S, author: &str, point: Point) -> Result<(), S::Error> {
        let Some(pending) = self.pending.get_mut(author) else {
            return Ok(());
        };
        pending.stroke.points.push(point);
        let count = pending.stroke.points.len();
        if count % self.factor == 0 {
            draw_points(surface, &pending.stroke, pending.rendered)?;
            pending.rendered = count - 1;
        }
        Ok(())
    }

    /// Close the author's stroke and render it in full. Returns the
    /// completed stroke.
    ///
    /// # Errors
    ///
    /// Propagates surface errors.
    pub fn end<S: RasterSurface>(&mut self, surface: &mut S, author: &str) -> Result<Option<Stroke>, S::Error> {
        let Some(pending) = self.pending.remove(author) else {
            return Ok(None);
        };
        draw_stroke(surface, &pending.stroke)?;
        Ok(Some(pending.stroke))
    }

    /// Redraw every open stroke in full (after the surface was repainted).
    ///
    /// # Errors
    ///
    /// Propagates surface errors.
    pub fn redraw_pending<S: RasterSurface>(&mut self, surface: &mut S) -> Result<(), S::Error> {
        for pending in self.pending.values_mut() {
            draw_stroke(surface, &pending.stroke)?;
            pending.rendered = pending.stroke.points.len().saturating_sub(1);
        }
        Ok(())
    }

    /// Forget one author's open stroke (they left).
    pub fn forget(&mut self, author: &str) {
        self.pending.remove(author);
    }

    /// Forget every open stroke.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    #[must_use]
    pub fn pending(&self, author: &str) -> Option<&Stroke> {
        self.pending.get(author).map(|p| &p.stroke)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
