//! Raster surface abstraction.
//!
//! The render scheduler draws through this trait and nothing else, always in
//! the order: clear, grid, axes, one path per visible function, present.
//! Backends only need immediate-mode path primitives; [`crate::term`]
//! provides the braille terminal implementation.

use crate::types::Rgba;

/// Drawing target with integer pixel dimensions and path-based strokes.
///
/// A path is built with [`RasterSurface::begin_path`] followed by
/// `move_to`/`line_to` calls; nothing is visible until
/// [`RasterSurface::stroke`]. Coordinates are in pixels with the origin at
/// the top-left.
pub trait RasterSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Resets every pixel to the background.
    fn clear(&mut self);

    /// Sets color and line width for subsequent strokes.
    fn set_stroke(&mut self, color: Rgba, width: f32);

    /// Starts a new path, discarding any unstroked one.
    fn begin_path(&mut self);

    /// Starts a new subpath at the given pixel.
    fn move_to(&mut self, x: f64, y: f64);

    /// Extends the current subpath with a line segment.
    fn line_to(&mut self, x: f64, y: f64);

    /// Draws the current path with the current stroke settings.
    fn stroke(&mut self);

    /// Flushes a completed frame to the output device. Offscreen backends
    /// can ignore this.
    fn present(&mut self) {}
}

// =============================================================================
// Test Double
// =============================================================================

#[cfg(test)]
pub use recording::{DrawOp, RecordingSurface};
