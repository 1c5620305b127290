//! Browser raster surface backed by a `<canvas>` 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//!
//! Snapshots are PNG data URLs. Restoring decodes through an
//! `HtmlImageElement`, which is asynchronous: the image is painted from its
//! `onload` callback, after the call returns.

use frames::{Point, Rgb, Snapshot};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::surface::RasterSurface;

#[derive(Debug, Clone)]
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// Bind to the canvas's 2D context.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the element has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(JsValue::from)?;
        Ok(Self { canvas, ctx })
    }

    /// Backing-store size in surface pixels.
    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        (f64::from(self.canvas.width()), f64::from(self.canvas.height()))
    }
}

impl RasterSurface for CanvasSurface {
    type Error = JsValue;

    fn draw_segment(&mut self, from: Point, to: Point, width: f64, color: Rgb) -> Result<(), JsValue> {
        let ctx = &self.ctx;
        ctx.set_stroke_style_str(&color.to_string());
        ctx.set_line_width(width);
        ctx.set_line_cap("round");
        ctx.set_line_join("round");
        ctx.begin_path();
        ctx.move_to(from.x, from.y);
        ctx.line_to(to.x, to.y);
        ctx.stroke();
        Ok(())
    }

    fn fill_all(&mut self, color: Rgb) -> Result<(), JsValue> {
        let (w, h) = self.size();
        self.ctx.set_fill_style_str(&color.to_string());
        self.ctx.fill_rect(0.0, 0.0, w, h);
        Ok(())
    }

    fn capture_snapshot(&mut self) -> Result<Snapshot, JsValue> {
        self.canvas.to_data_url().map(Snapshot::from)
    }

    fn restore_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), JsValue> {
        let image = HtmlImageElement::new()?;
        let ctx = self.ctx.clone();
        let loaded = image.clone();
        let onload = Closure::once_into_js(move || -> Result<(), JsValue> {
            ctx.draw_image_with_html_image_element(&loaded, 0.0, 0.0)
        });
        image.set_onload(Some(onload.unchecked_ref()));
        image.set_src(snapshot.as_str());
        Ok(())
    }
}
