//! Viewport - Domain rectangle and coordinate transforms
//!
//! The visible region of the Cartesian plane, plus the affine maps between
//! domain coordinates and raster pixels. The raster origin is top-left, so
//! the vertical axis flips during conversion.

use crate::state::Value;

/// Target minimum pixel spacing between adjacent grid lines.
pub const DEFAULT_GRID_SPACING_PX: f64 = 50.0;

/// Zoom limits: an axis span never leaves this window.
const MIN_SPAN: f64 = 1e-9;
const MAX_SPAN: f64 = 1e12;

// =============================================================================
// Viewport
// =============================================================================

/// Axis-aligned domain rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x_min: -10.0,
            x_max: 10.0,
            y_min: -10.0,
            y_max: 10.0,
        }
    }
}

impl Viewport {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    #[inline]
    pub fn x_range(&self) -> f64 {
        self.x_max - self.x_min
    }

    #[inline]
    pub fn y_range(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Finite bounds with positive extent on both axes.
    pub fn is_valid(&self) -> bool {
        self.x_min.is_finite()
            && self.x_max.is_finite()
            && self.y_min.is_finite()
            && self.y_max.is_finite()
            && self.x_min < self.x_max
            && self.y_min < self.y_max
    }

    // =========================================================================
    // Transforms
    // =========================================================================

    /// Domain point to raster pixel. `pixel_y` grows downward, so the
    /// vertical axis inverts: `pixel_y = height - normalized_y * height`.
    pub fn domain_to_pixel(&self, x: f64, y: f64, width: u32, height: u32) -> (f64, f64) {
        let nx = (x - self.x_min) / self.x_range();
        let ny = (y - self.y_min) / self.y_range();
        (nx * width as f64, height as f64 - ny * height as f64)
    }

    /// Raster pixel to domain point. Inverse of [`Viewport::domain_to_pixel`].
    pub fn pixel_to_domain(&self, px: f64, py: f64, width: u32, height: u32) -> (f64, f64) {
        let x = self.x_min + (px / width as f64) * self.x_range();
        let y = self.y_min + (1.0 - py / height as f64) * self.y_range();
        (x, y)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Translates the view by a raster-space pixel delta. Positive `dx`
    /// moves the view right; positive `dy` moves it down (raster y grows
    /// downward, so the domain bounds decrease). Zoom level is unchanged.
    /// A zero-extent raster or a non-finite shift leaves the view alone.
    pub fn pan_by_pixels(&mut self, dx: f64, dy: f64, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let shift_x = dx * self.x_range() / width as f64;
        let shift_y = dy * self.y_range() / height as f64;
        if !(shift_x.is_finite() && shift_y.is_finite()) {
            return;
        }
        self.x_min += shift_x;
        self.x_max += shift_x;
        self.y_min -= shift_y;
        self.y_max -= shift_y;
    }

    /// Rescales both axes by `factor` (>1 zooms in) while keeping the domain
    /// point under the pixel anchor fixed. A zoom that would push either
    /// span outside its limits leaves the viewport unchanged, as does a
    /// zero-extent raster or a non-finite anchor.
    pub fn zoom_at(&mut self, px: f64, py: f64, factor: f64, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let new_x_range = self.x_range() / factor;
        let new_y_range = self.y_range() / factor;
        if !span_allowed(new_x_range) || !span_allowed(new_y_range) {
            return;
        }

        let (anchor_x, anchor_y) = self.pixel_to_domain(px, py, width, height);
        if !(anchor_x.is_finite() && anchor_y.is_finite()) {
            return;
        }
        let fx = px / width as f64;
        let fy = 1.0 - py / height as f64;
        self.x_min = anchor_x - fx * new_x_range;
        self.x_max = self.x_min + new_x_range;
        self.y_min = anchor_y - fy * new_y_range;
        self.y_max = self.y_min + new_y_range;
    }

    /// [`Viewport::zoom_at`] anchored at the center of the view.
    pub fn zoom_centered(&mut self, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let new_x_range = self.x_range() / factor;
        let new_y_range = self.y_range() / factor;
        if !span_allowed(new_x_range) || !span_allowed(new_y_range) {
            return;
        }

        let cx = (self.x_min + self.x_max) / 2.0;
        let cy = (self.y_min + self.y_max) / 2.0;
        self.x_min = cx - new_x_range / 2.0;
        self.x_max = cx + new_x_range / 2.0;
        self.y_min = cy - new_y_range / 2.0;
        self.y_max = cy + new_y_range / 2.0;
    }

    // =========================================================================
    // State Conversion
    // =========================================================================

    /// Reads a viewport from its state-tree map form. Returns `None` when a
    /// bound is missing, non-numeric, or the rectangle is degenerate.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_map()?;
        let read = |key: &str| map.get(key).and_then(Value::as_f64);
        let viewport = Self {
            x_min: read("xMin")?,
            x_max: read("xMax")?,
            y_min: read("yMin")?,
            y_max: read("yMax")?,
        };
        viewport.is_valid().then_some(viewport)
    }

    /// State-tree map form: `{xMin, xMax, yMin, yMax}`.
    pub fn to_value(&self) -> Value {
        Value::object([
            ("xMin", Value::from(self.x_min)),
            ("xMax", Value::from(self.x_max)),
            ("yMin", Value::from(self.y_min)),
            ("yMax", Value::from(self.y_max)),
        ])
    }
}

#[inline]
fn span_allowed(span: f64) -> bool {
    (MIN_SPAN..=MAX_SPAN).contains(&span)
}

// =============================================================================
// Grid Steps
// =============================================================================

/// Picks a "nice" grid step for `range` domain units across `extent_px`
/// pixels: the smallest value of the form {1, 2, 5} × 10^k that keeps
/// adjacent grid lines at least `min_spacing_px` apart.
pub fn grid_step(range: f64, extent_px: u32, min_spacing_px: f64) -> f64 {
    if !(range > 0.0 && range.is_finite()) || extent_px == 0 || !(min_spacing_px > 0.0) {
        return 1.0;
    }
    let raw = range * min_spacing_px / extent_px as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_round_trip() {
        let viewport = Viewport::default();
        let (px, py) = viewport.domain_to_pixel(3.0, 4.0, 200, 100);
        let (x, y) = viewport.pixel_to_domain(px, py, 200, 100);
        assert!((x - 3.0).abs() < 1e-9);
        assert!((y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_vertical_axis_is_inverted() {
        let viewport = Viewport::default();
        let (_, top) = viewport.domain_to_pixel(0.0, viewport.y_max, 100, 80);
        let (_, bottom) = viewport.domain_to_pixel(0.0, viewport.y_min, 100, 80);
        assert_eq!(top, 0.0);
        assert_eq!(bottom, 80.0);
    }

    #[test]
    fn test_pan_translates_without_rescaling() {
        let mut viewport = Viewport::default();
        viewport.pan_by_pixels(10.0, 0.0, 100, 100);
        assert_eq!((viewport.x_min, viewport.x_max), (-8.0, 12.0));
        assert_eq!((viewport.y_min, viewport.y_max), (-10.0, 10.0));

        // Panning down shows lower y values.
        viewport.pan_by_pixels(0.0, 10.0, 100, 100);
        assert_eq!((viewport.y_min, viewport.y_max), (-12.0, 8.0));
        assert_eq!(viewport.x_range(), 20.0);
        assert_eq!(viewport.y_range(), 20.0);
    }

    #[test]
    fn test_zoom_at_keeps_anchor_fixed() {
        let mut viewport = Viewport::default();
        let (anchor_x, anchor_y) = viewport.pixel_to_domain(30.0, 70.0, 100, 100);
        viewport.zoom_at(30.0, 70.0, 2.0, 100, 100);

        assert_eq!(viewport.x_range(), 10.0);
        assert_eq!(viewport.y_range(), 10.0);
        let (x, y) = viewport.pixel_to_domain(30.0, 70.0, 100, 100);
        assert!((x - anchor_x).abs() < 1e-9);
        assert!((y - anchor_y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_centered() {
        let mut viewport = Viewport::new(0.0, 4.0, -2.0, 2.0);
        viewport.zoom_centered(2.0);
        assert_eq!((viewport.x_min, viewport.x_max), (1.0, 3.0));
        assert_eq!((viewport.y_min, viewport.y_max), (-1.0, 1.0));

        viewport.zoom_centered(0.5);
        assert_eq!((viewport.x_min, viewport.x_max), (0.0, 4.0));
    }

    #[test]
    fn test_zoom_clamps_at_span_limits() {
        let mut viewport = Viewport::new(0.0, 1e-9, 0.0, 1e-9);
        let before = viewport;
        viewport.zoom_centered(10.0);
        assert_eq!(viewport, before);

        let mut viewport = Viewport::new(0.0, 1e12, 0.0, 1e12);
        let before = viewport;
        viewport.zoom_centered(0.1);
        assert_eq!(viewport, before);
    }

    #[test]
    fn test_pan_ignores_degenerate_input() {
        let mut viewport = Viewport::default();
        let before = viewport;
        viewport.pan_by_pixels(8.0, 0.0, 0, 80);
        viewport.pan_by_pixels(0.0, 8.0, 100, 0);
        viewport.pan_by_pixels(f64::INFINITY, 0.0, 100, 80);
        viewport.pan_by_pixels(f64::NAN, f64::NAN, 100, 80);
        assert_eq!(viewport, before);
        assert!(viewport.is_valid());
    }

    #[test]
    fn test_zoom_at_ignores_degenerate_input() {
        let mut viewport = Viewport::default();
        let before = viewport;
        viewport.zoom_at(50.0, 40.0, 2.0, 0, 80);
        viewport.zoom_at(50.0, 40.0, 2.0, 100, 0);
        viewport.zoom_at(f64::NAN, 40.0, 2.0, 100, 80);
        viewport.zoom_at(f64::INFINITY, 40.0, 2.0, 100, 80);
        assert_eq!(viewport, before);
        assert!(viewport.is_valid());
    }

    #[test]
    fn test_grid_step_picks_nice_numbers() {
        // 20 units over 800px at 50px spacing: raw 1.25 rounds up to 2.
        assert_eq!(grid_step(20.0, 800, 50.0), 2.0);
        // Raw exactly on a nice value stays there.
        assert_eq!(grid_step(16.0, 800, 50.0), 1.0);
        // Small ranges step down through powers of ten.
        assert!((grid_step(0.5, 800, 50.0) - 0.05).abs() < 1e-12);
        // Large ranges step up.
        assert_eq!(grid_step(3000.0, 800, 50.0), 200.0);
    }

    #[test]
    fn test_grid_step_spacing_meets_minimum() {
        for range in [0.001, 0.7, 3.0, 20.0, 1234.0] {
            let step = grid_step(range, 640, 50.0);
            let spacing_px = step / range * 640.0;
            assert!(
                spacing_px >= 50.0 - 1e-9,
                "range {range}: step {step} gives {spacing_px}px"
            );
        }
    }

    #[test]
    fn test_grid_step_degenerate_input() {
        assert_eq!(grid_step(0.0, 800, 50.0), 1.0);
        assert_eq!(grid_step(f64::NAN, 800, 50.0), 1.0);
        assert_eq!(grid_step(10.0, 0, 50.0), 1.0);
    }

    #[test]
    fn test_value_round_trip() {
        let viewport = Viewport::new(-5.0, 5.0, -1.0, 3.0);
        assert_eq!(Viewport::from_value(&viewport.to_value()), Some(viewport));

        // Missing bound or degenerate rectangle is rejected.
        let mut partial = viewport.to_value();
        if let Value::Map(map) = &mut partial {
            map.remove("yMax");
        }
        assert_eq!(Viewport::from_value(&partial), None);
        assert_eq!(
            Viewport::from_value(&Viewport::new(5.0, -5.0, 0.0, 1.0).to_value()),
            None
        );
        assert_eq!(Viewport::from_value(&Value::from(3.0)), None);
    }
}
