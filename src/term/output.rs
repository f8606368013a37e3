//! Terminal Output - Presenting braille frames
//!
//! `TermPresenter` turns a [`BrailleCanvas`] into ANSI output, and
//! `TermSurface` adapts the canvas + presenter pair to the
//! [`RasterSurface`] trait the render scheduler draws against.
//!
//! # Pipeline
//!
//! 1. Wrap the frame in a synchronized block (begin_sync/end_sync)
//! 2. For each row: move cursor, emit glyphs, switching the foreground
//!    color only when a run of cells changes color
//! 3. Flush the assembled frame to the sink in a single write

use std::io::{self, Write};

use tracing::error;

use super::ansi;
use super::canvas::BrailleCanvas;
use crate::surface::RasterSurface;
use crate::types::{Rgba, Stroke};

// =============================================================================
// TermPresenter
// =============================================================================

/// Writes braille frames to a terminal-like sink.
///
/// Escape codes and glyphs accumulate in an internal buffer and flush
/// once per frame, so a frame never tears across syscalls. The current
/// foreground color is tracked while emitting, so a run of same-colored
/// cells costs a single escape sequence.
pub struct TermPresenter<W: Write> {
    out: W,
    buf: Vec<u8>,
    fullscreen: bool,
}

impl<W: Write> TermPresenter<W> {
    /// Create a presenter writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            buf: Vec::with_capacity(16384),
            fullscreen: false,
        }
    }

    /// Enter fullscreen mode (alternate screen buffer).
    pub fn enter_fullscreen(&mut self) -> io::Result<()> {
        ansi::enter_alt_screen(&mut self.buf)?;
        ansi::cursor_hide(&mut self.buf)?;
        ansi::clear_screen(&mut self.buf)?;
        self.flush()?;
        self.fullscreen = true;
        Ok(())
    }

    /// Exit fullscreen mode, restoring cursor and colors.
    pub fn exit_fullscreen(&mut self) -> io::Result<()> {
        ansi::reset(&mut self.buf)?;
        ansi::cursor_show(&mut self.buf)?;
        ansi::exit_alt_screen(&mut self.buf)?;
        self.flush()?;
        self.fullscreen = false;
        Ok(())
    }

    /// Render a full frame.
    pub fn draw(&mut self, canvas: &BrailleCanvas) -> io::Result<()> {
        ansi::begin_sync(&mut self.buf)?;

        let mut current: Option<Rgba> = None;
        for row in 0..canvas.rows() {
            ansi::cursor_to(&mut self.buf, 0, row)?;
            for col in 0..canvas.cols() {
                let dots = canvas.cell(col, row);
                // Blank cells are plain spaces; no color switch needed.
                if dots.is_empty() {
                    self.buf.push(b' ');
                    continue;
                }
                let color = canvas.cell_color(col, row).unwrap_or(Rgba::WHITE);
                if current != Some(color) {
                    ansi::fg_rgb(&mut self.buf, color)?;
                    current = Some(color);
                }
                let mut utf8 = [0u8; 4];
                self.buf
                    .extend_from_slice(dots.glyph().encode_utf8(&mut utf8).as_bytes());
            }
        }

        ansi::reset(&mut self.buf)?;
        ansi::end_sync(&mut self.buf)?;
        self.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.out.write_all(&self.buf)?;
        self.out.flush()?;
        self.buf.clear();
        Ok(())
    }
}

impl<W: Write> Drop for TermPresenter<W> {
    fn drop(&mut self) {
        if self.fullscreen {
            let _ = self.exit_fullscreen();
        }
    }
}

// =============================================================================
// TermSurface
// =============================================================================

/// Braille-backed drawing surface for terminals.
///
/// Implements [`RasterSurface`] over a [`BrailleCanvas`]: path calls
/// accumulate line segments, `stroke` rasterizes them onto the canvas,
/// and `present` pushes the finished frame through a [`TermPresenter`].
pub struct TermSurface<W: Write> {
    canvas: BrailleCanvas,
    presenter: TermPresenter<W>,
    stroke: Stroke,
    segments: Vec<((f64, f64), (f64, f64))>,
    cursor: Option<(f64, f64)>,
}

impl<W: Write> TermSurface<W> {
    /// Create a surface of `cols` x `rows` terminal cells writing to `out`.
    pub fn new(cols: u16, rows: u16, out: W) -> Self {
        Self {
            canvas: BrailleCanvas::new(cols, rows),
            presenter: TermPresenter::new(out),
            stroke: Stroke::default(),
            segments: Vec::new(),
            cursor: None,
        }
    }

    /// Enter fullscreen mode on the underlying terminal.
    pub fn enter_fullscreen(&mut self) -> io::Result<()> {
        self.presenter.enter_fullscreen()
    }

    /// Exit fullscreen mode.
    pub fn exit_fullscreen(&mut self) -> io::Result<()> {
        self.presenter.exit_fullscreen()
    }

    /// The canvas frames are drawn into.
    pub fn canvas(&self) -> &BrailleCanvas {
        &self.canvas
    }
}

impl TermSurface<io::Stdout> {
    /// Create a surface writing to stdout.
    pub fn stdout(cols: u16, rows: u16) -> Self {
        Self::new(cols, rows, io::stdout())
    }
}

impl<W: Write> RasterSurface for TermSurface<W> {
    fn width(&self) -> u32 {
        self.canvas.width_px()
    }

    fn height(&self) -> u32 {
        self.canvas.height_px()
    }

    fn clear(&mut self) {
        self.canvas.clear();
    }

    fn set_stroke(&mut self, color: Rgba, width: f32) {
        self.stroke = Stroke { color, width };
    }

    fn begin_path(&mut self) {
        self.segments.clear();
        self.cursor = None;
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.cursor = Some((x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        if let Some((x0, y0)) = self.cursor {
            self.segments.push(((x0, y0), (x, y)));
        }
        self.cursor = Some((x, y));
    }

    fn stroke(&mut self) {
        // Braille dots have no thickness; stroke width is ignored.
        for &((x0, y0), (x1, y1)) in &self.segments {
            self.canvas.draw_line(x0, y0, x1, y1, self.stroke.color);
        }
    }

    fn present(&mut self) {
        if let Err(err) = self.presenter.draw(&self.canvas) {
            error!(error = %err, "terminal write failed");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn is_braille(c: char) -> bool {
        ('\u{2800}'..='\u{28ff}').contains(&c)
    }

    #[test]
    fn test_draw_wraps_frame_in_sync_block() {
        let mut sink: Vec<u8> = Vec::new();
        {
            let mut presenter = TermPresenter::new(&mut sink);
            let canvas = BrailleCanvas::new(2, 1);
            presenter.draw(&canvas).unwrap();
        }
        let text = String::from_utf8(sink).unwrap();
        assert!(text.starts_with("\x1b[?2026h"));
        assert!(text.ends_with("\x1b[0m\x1b[?2026l"));
        assert!(text.contains("\x1b[1;1H"));
    }

    #[test]
    fn test_blank_cells_render_as_spaces_without_color() {
        let mut sink: Vec<u8> = Vec::new();
        {
            let mut presenter = TermPresenter::new(&mut sink);
            let canvas = BrailleCanvas::new(3, 1);
            presenter.draw(&canvas).unwrap();
        }
        let text = String::from_utf8(sink).unwrap();
        assert!(text.contains("   "));
        assert!(!text.contains("\x1b[38;2;"));
    }

    #[test]
    fn test_same_color_run_sets_color_once() {
        let mut canvas = BrailleCanvas::new(4, 1);
        canvas.draw_line(0.0, 0.0, 7.0, 0.0, Rgba::rgb(255, 0, 0));

        let mut sink: Vec<u8> = Vec::new();
        {
            let mut presenter = TermPresenter::new(&mut sink);
            presenter.draw(&canvas).unwrap();
        }
        let text = String::from_utf8(sink).unwrap();
        assert_eq!(text.matches("\x1b[38;2;255;0;0m").count(), 1);
        assert_eq!(text.chars().filter(|&c| is_braille(c)).count(), 4);
    }

    #[test]
    fn test_color_switches_between_runs() {
        let mut canvas = BrailleCanvas::new(2, 1);
        canvas.set_pixel(0, 0, Rgba::rgb(255, 0, 0));
        canvas.set_pixel(2, 0, Rgba::rgb(0, 0, 255));

        let mut sink: Vec<u8> = Vec::new();
        {
            let mut presenter = TermPresenter::new(&mut sink);
            presenter.draw(&canvas).unwrap();
        }
        let text = String::from_utf8(sink).unwrap();
        assert!(text.contains("\x1b[38;2;255;0;0m"));
        assert!(text.contains("\x1b[38;2;0;0;255m"));
    }

    #[test]
    fn test_enter_exit_fullscreen_sequences() {
        let mut sink: Vec<u8> = Vec::new();
        {
            let mut presenter = TermPresenter::new(&mut sink);
            presenter.enter_fullscreen().unwrap();
            presenter.exit_fullscreen().unwrap();
        }
        let text = String::from_utf8(sink).unwrap();
        assert!(text.contains("\x1b[?1049h"));
        assert!(text.contains("\x1b[?25l"));
        assert!(text.contains("\x1b[?25h"));
        assert!(text.contains("\x1b[?1049l"));
    }

    #[test]
    fn test_drop_leaves_fullscreen() {
        let mut sink: Vec<u8> = Vec::new();
        {
            let mut presenter = TermPresenter::new(&mut sink);
            presenter.enter_fullscreen().unwrap();
        }
        let text = String::from_utf8(sink).unwrap();
        assert!(text.ends_with("\x1b[?1049l"));
    }

    #[test]
    fn test_drop_without_fullscreen_writes_nothing() {
        let mut sink: Vec<u8> = Vec::new();
        {
            let _presenter = TermPresenter::new(&mut sink);
        }
        assert!(sink.is_empty());
    }

    #[test]
    fn test_surface_dimensions_in_pixels() {
        let surface = TermSurface::new(40, 20, Vec::new());
        assert_eq!(surface.width(), 80);
        assert_eq!(surface.height(), 80);
    }

    #[test]
    fn test_nothing_rasterized_until_stroke() {
        let mut surface = TermSurface::new(4, 4, Vec::new());
        surface.begin_path();
        surface.move_to(0.0, 0.0);
        surface.line_to(7.0, 0.0);
        assert!(surface.canvas().cell(0, 0).is_empty());

        surface.stroke();
        assert!(!surface.canvas().cell(0, 0).is_empty());
        assert!(!surface.canvas().cell(3, 0).is_empty());
    }

    #[test]
    fn test_line_to_without_move_starts_the_path() {
        let mut surface = TermSurface::new(4, 4, Vec::new());
        surface.begin_path();
        surface.line_to(0.0, 0.0);
        surface.line_to(3.0, 0.0);
        surface.stroke();
        assert!(!surface.canvas().cell(0, 0).is_empty());
        assert!(!surface.canvas().cell(1, 0).is_empty());
    }

    #[test]
    fn test_begin_path_discards_pending_segments() {
        let mut surface = TermSurface::new(4, 4, Vec::new());
        surface.move_to(0.0, 0.0);
        surface.line_to(7.0, 0.0);
        surface.begin_path();
        surface.stroke();
        assert!(surface.canvas().cell(0, 0).is_empty());
    }

    #[test]
    fn test_stroke_uses_current_color() {
        let mut surface = TermSurface::new(4, 4, Vec::new());
        surface.set_stroke(Rgba::rgb(10, 20, 30), 1.0);
        surface.begin_path();
        surface.move_to(0.0, 0.0);
        surface.line_to(3.0, 0.0);
        surface.stroke();
        assert_eq!(surface.canvas().cell_color(0, 0), Some(Rgba::rgb(10, 20, 30)));
    }

    #[test]
    fn test_present_writes_braille_glyphs() {
        let mut sink: Vec<u8> = Vec::new();
        {
            let mut surface = TermSurface::new(4, 2, &mut sink);
            surface.begin_path();
            surface.move_to(0.0, 0.0);
            surface.line_to(7.0, 0.0);
            surface.stroke();
            surface.present();
        }
        let text = String::from_utf8(sink).unwrap();
        assert!(text.chars().any(is_braille));
    }
}
