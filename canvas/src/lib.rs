//! Client canvas engine for the shared sketch room.
//!
//! Compiled to WebAssembly and driven by a thin JavaScript host that wires
//! pointer events and the relay websocket to [`engine::Engine`]. All drawing
//! goes through the [`surface::RasterSurface`] seam, so everything except
//! [`render`] and the facade half of [`engine`] runs in native tests.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Browser facade and testable [`engine::EngineCore`] |
//! | [`capture`] | Local stroke state machine and cursor throttle |
//! | [`compositor`] | Decimated rendering of in-progress remote strokes |
//! | [`history`] | Bounded snapshot history for local undo/redo |
//! | [`sync`] | Late-join resync and peer undo/redo replay |
//! | [`surface`] | Raster surface trait and stroke drawing helpers |
//! | [`viewport`] | Client-to-surface coordinate mapping |
//! | [`render`] | `<canvas>` 2D implementation of the surface |
//! | [`consts`] | Shared constants (decimation, throttle, history size) |

pub mod capture;
pub mod compositor;
pub mod consts;
pub mod engine;
pub mod history;
pub mod render;
pub mod surface;
pub mod sync;
pub mod viewport;

#[cfg(test)]
#[path = "recording_test.rs"]
pub(crate) mod recording;
