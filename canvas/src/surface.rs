//! Raster surface seam.
//!
//! Everything that puts pixels on screen goes through [`RasterSurface`]. The
//! browser implementation lives in [`crate::render`]; tests use an in-memory
//! recorder. The helpers here are the only stroke-drawing code, so local,
//! remote, and replayed strokes render identically.

use frames::{Point, Rgb, Snapshot, Stroke};

use crate::consts::BACKGROUND;

/// A drawable raster that can be captured and restored whole.
pub trait RasterSurface {
    type Error;

    /// Stroke a round-capped line segment.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if drawing fails.
    fn draw_segment(&mut self, from: Point, to: Point, width: f64, color: Rgb) -> Result<(), Self::Error>;

    /// Fill the entire surface with one color.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if drawing fails.
    fn fill_all(&mut self, color: Rgb) -> Result<(), Self::Error>;

    /// Capture the current raster.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the raster cannot be encoded.
    fn capture_snapshot(&mut self) -> Result<Snapshot, Self::Error>;

    /// Replace the raster with a previously captured snapshot.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the snapshot cannot be decoded.
    fn restore_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), Self::Error>;
}

/// Show a snapshot. The blank snapshot is painted as background.
///
/// # Errors
///
/// Propagates surface errors.
pub fn paint_snapshot<S: RasterSurface>(surface: &mut S, snapshot: &Snapshot) -> Result<(), S::Error> {
    if snapshot.is_blank() {
        surface.fill_all(BACKGROUND)
    } else {
        surface.restore_snapshot(snapshot)
    }
}

/// Draw the polyline through `points[from..]`, starting at `points[from]`.
///
/// A lone point is drawn as a zero-length segment (a dot).
///
/// # Errors
///
/// Propagates surface errors.
pub fn draw_points<S: RasterSurface>(surface: &mut S, stroke: &Stroke, from: usize) -> Result<(), S::Error> {
    let ink = stroke.ink(BACKGROUND);
    let Some(tail) = stroke.points.get(from..) else {
        return Ok(());
    };
    match tail {
        [] => Ok(()),
        [only] => surface.draw_segment(*only, *only, stroke.width, ink),
        _ => {
            for pair in tail.windows(2) {
                surface.draw_segment(pair[0], pair[1], stroke.width, ink)?;
            }
            Ok(())
        }
    }
}

/// Draw a complete stroke.
///
/// # Errors
///
/// Propagates surface errors.
pub fn draw_stroke<S: RasterSurface>(surface: &mut S, stroke: &Stroke) -> Result<(), S::Error> {
    draw_points(surface, stroke, 0)
}

/// Repaint from scratch: background, then every stroke in order.
///
/// # Errors
///
/// Propagates surface errors.
pub fn repaint<'a, S, I>(surface: &mut S, strokes: I) -> Result<(), S::Error>
where
    S: RasterSurface,
    I: IntoIterator<Item = &'a Stroke>,
{
    surface.fill_all(BACKGROUND)?;
    for stroke in strokes {
        draw_stroke(surface, stroke)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;
