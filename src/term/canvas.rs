//! Braille Canvas - 2x4 pixels per terminal cell
//!
//! Each terminal cell holds a braille glyph (U+2800 block), giving a
//! pseudo-pixel raster twice as wide and four times as tall as the
//! character grid. Cells carry one foreground color; the last pixel
//! painted into a cell decides it.

use bitflags::bitflags;

use crate::types::Rgba;

/// Pixels per cell, horizontally.
pub const CELL_WIDTH_PX: u32 = 2;
/// Pixels per cell, vertically.
pub const CELL_HEIGHT_PX: u32 = 4;

bitflags! {
    /// Dot bits of one braille cell. Bit values follow the Unicode braille
    /// encoding, where the glyph is `U+2800 + bits`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Dots: u8 {
        const DOT_1 = 0x01;
        const DOT_2 = 0x02;
        const DOT_3 = 0x04;
        const DOT_4 = 0x08;
        const DOT_5 = 0x10;
        const DOT_6 = 0x20;
        const DOT_7 = 0x40;
        const DOT_8 = 0x80;
    }
}

impl Dots {
    /// The dot covering pixel `(dx, dy)` within a cell, column-major the
    /// way Unicode numbers them: dots 1-3 and 7 down the left column, dots
    /// 4-6 and 8 down the right.
    pub fn at(dx: u32, dy: u32) -> Self {
        match (dx, dy) {
            (0, 0) => Self::DOT_1,
            (0, 1) => Self::DOT_2,
            (0, 2) => Self::DOT_3,
            (0, 3) => Self::DOT_7,
            (1, 0) => Self::DOT_4,
            (1, 1) => Self::DOT_5,
            (1, 2) => Self::DOT_6,
            (1, 3) => Self::DOT_8,
            _ => Self::empty(),
        }
    }

    /// The character rendering these dots, or a plain space for an empty
    /// cell.
    pub fn glyph(self) -> char {
        if self.is_empty() {
            return ' ';
        }
        char::from_u32(0x2800 + self.bits() as u32).unwrap_or(' ')
    }
}

// =============================================================================
// BrailleCanvas
// =============================================================================

/// Fixed-size braille pixel buffer.
pub struct BrailleCanvas {
    cols: u16,
    rows: u16,
    cells: Vec<Dots>,
    colors: Vec<Option<Rgba>>,
}

impl BrailleCanvas {
    pub fn new(cols: u16, rows: u16) -> Self {
        let len = cols as usize * rows as usize;
        Self {
            cols,
            rows,
            cells: vec![Dots::empty(); len],
            colors: vec![None; len],
        }
    }

    #[inline]
    pub fn cols(&self) -> u16 {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Raster width in pixels.
    #[inline]
    pub fn width_px(&self) -> u32 {
        self.cols as u32 * CELL_WIDTH_PX
    }

    /// Raster height in pixels.
    #[inline]
    pub fn height_px(&self) -> u32 {
        self.rows as u32 * CELL_HEIGHT_PX
    }

    pub fn clear(&mut self) {
        self.cells.fill(Dots::empty());
        self.colors.fill(None);
    }

    /// Paints one pixel. Out-of-bounds coordinates are ignored.
    pub fn set_pixel(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width_px() as i64 || y >= self.height_px() as i64 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let index =
            (y / CELL_HEIGHT_PX) as usize * self.cols as usize + (x / CELL_WIDTH_PX) as usize;
        self.cells[index] |= Dots::at(x % CELL_WIDTH_PX, y % CELL_HEIGHT_PX);
        self.colors[index] = Some(color);
    }

    /// Draws a line with a float DDA, painting every intermediate pixel.
    pub fn draw_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgba) {
        if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
            return;
        }
        let dx = x1 - x0;
        let dy = y1 - y0;
        let steps = dx.abs().max(dy.abs()).ceil() as usize;
        if steps == 0 {
            self.set_pixel(x0.round() as i64, y0.round() as i64, color);
            return;
        }
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = (x0 + dx * t).round() as i64;
            let y = (y0 + dy * t).round() as i64;
            self.set_pixel(x, y, color);
        }
    }

    /// Dot bits of the cell at `(col, row)`.
    pub fn cell(&self, col: u16, row: u16) -> Dots {
        if col >= self.cols || row >= self.rows {
            return Dots::empty();
        }
        self.cells[row as usize * self.cols as usize + col as usize]
    }

    /// Foreground color of the cell at `(col, row)`, if any pixel was
    /// painted into it.
    pub fn cell_color(&self, col: u16, row: u16) -> Option<Rgba> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.colors[row as usize * self.cols as usize + col as usize]
    }
}

// =============================================================================
// Tests
// =============================================================================
