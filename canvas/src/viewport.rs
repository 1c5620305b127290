//! Pointer coordinate mapping between the page and the canvas backing store.
//!
//! Input arrives in client (CSS) pixels and is drawn in surface pixels;
//! remote cursors go the other way for the host's overlay.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

use frames::Point;

/// Mapping from pointer client coordinates (CSS pixels) to canvas-surface
/// coordinates (backing-store pixels).
///
/// `left` / `top` / `css_width` / `css_height` come from the element's
/// bounding client rect. `surface_width` / `surface_height` are the canvas
/// backing size, which differs from the CSS size by the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub css_width: f64,
    pub css_height: f64,
    pub surface_width: f64,
    pub surface_height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { left: 0.0, top: 0.0, css_width: 1.0, css_height: 1.0, surface_width: 1.0, surface_height: 1.0 }
    }
}

impl Viewport {
    /// Viewport for a canvas whose backing size matches its CSS size.
    #[must_use]
    pub fn unscaled(width: f64, height: f64) -> Self {
        Self { left: 0.0, top: 0.0, css_width: width, css_height: height, surface_width: width, surface_height: height }
    }

    /// Convert a client-space point to surface coordinates.
    #[must_use]
    pub fn to_surface(self, client_x: f64, client_y: f64) -> Point {
        Point {
            x: (client_x - self.left) * Self::scale(self.surface_width, self.css_width),
            y: (client_y - self.top) * Self::scale(self.surface_height, self.css_height),
        }
    }

    /// Convert a surface point back to client space.
    #[must_use]
    pub fn to_client(self, surface: Point) -> Point {
        Point {
            x: surface.x / Self::scale(self.surface_width, self.css_width) + self.left,
            y: surface.y / Self::scale(self.surface_height, self.css_height) + self.top,
        }
    }

    /// Degenerate (zero or non-finite) sizes map 1:1.
    fn scale(surface: f64, css: f64) -> f64 {
        let s = surface / css;
        if s.is_finite() && s > 0.0 { s } else { 1.0 }
    }
}
