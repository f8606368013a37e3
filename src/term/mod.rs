//! Terminal Backend - Braille plotting for ANSI terminals
//!
//! Renders the pipeline's frames as braille glyphs (2x4 dots per cell)
//! with 24-bit color:
//!
//! - **canvas** - Braille dot raster and line drawing
//! - **ansi** - Escape sequence helpers
//! - **output** - Frame presenter and the terminal `RasterSurface`
//! - **input** - crossterm key events to plot actions

pub mod ansi;
pub mod canvas;
pub mod input;
pub mod output;

pub use canvas::{BrailleCanvas, CELL_HEIGHT_PX, CELL_WIDTH_PX, Dots};
pub use input::{PAN_STEP_PX, PlotAction, poll_action};
pub use output::{TermPresenter, TermSurface};
