//! Input Module - Key to plot-action conversion
//!
//! Bridges crossterm's event system with the plot pipeline. Raw key
//! events become semantic [`PlotAction`]s the caller applies to a
//! `RenderScheduler` and `StateStore`.
//!
//! # API
//!
//! - `convert_event` - Convert any crossterm event to a plot action
//! - `convert_key_event` - Convert a key event to a plot action
//! - `poll_action` - Non-blocking action check with timeout
//!
//! # Example
//!
//! ```ignore
//! use spark_plot::term::input::{poll_action, PlotAction};
//! use std::time::Duration;
//!
//! loop {
//!     if let Ok(Some(action)) = poll_action(Duration::from_millis(16)) {
//!         match action {
//!             PlotAction::Quit => break,
//!             other => apply(other),
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use crossterm::event::{
    Event as CrosstermEvent, KeyCode, KeyEvent as CrosstermKeyEvent, KeyEventKind, KeyModifiers,
    poll, read,
};

// =============================================================================
// PLOT ACTIONS
// =============================================================================

/// Pixels panned per arrow key press.
pub const PAN_STEP_PX: f64 = 8.0;

/// Semantic plot commands produced from raw input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlotAction {
    /// Pan the viewport by (dx, dy) pixels.
    Pan(f64, f64),
    /// Zoom in around the viewport center.
    ZoomIn,
    /// Zoom out around the viewport center.
    ZoomOut,
    /// Toggle the background grid.
    ToggleGrid,
    /// Toggle the axis lines.
    ToggleAxes,
    /// Reset the viewport to its default range.
    Reset,
    /// Terminal was resized to (cols, rows).
    Resize(u16, u16),
    /// Leave the event loop.
    Quit,
}

// =============================================================================
// EVENT CONVERSION
// =============================================================================

/// Convert a crossterm event to a plot action.
pub fn convert_event(event: CrosstermEvent) -> Option<PlotAction> {
    match event {
        CrosstermEvent::Key(key) => convert_key_event(key),
        CrosstermEvent::Resize(cols, rows) => Some(PlotAction::Resize(cols, rows)),
        _ => None,
    }
}

/// Convert a crossterm key event to a plot action.
///
/// Release events are ignored; press and repeat both produce actions so
/// held arrows keep panning.
pub fn convert_key_event(event: CrosstermKeyEvent) -> Option<PlotAction> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    if event.modifiers.contains(KeyModifiers::CONTROL) && event.code == KeyCode::Char('c') {
        return Some(PlotAction::Quit);
    }
    match event.code {
        KeyCode::Left => Some(PlotAction::Pan(-PAN_STEP_PX, 0.0)),
        KeyCode::Right => Some(PlotAction::Pan(PAN_STEP_PX, 0.0)),
        KeyCode::Up => Some(PlotAction::Pan(0.0, -PAN_STEP_PX)),
        KeyCode::Down => Some(PlotAction::Pan(0.0, PAN_STEP_PX)),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(PlotAction::ZoomIn),
        KeyCode::Char('-') | KeyCode::Char('_') => Some(PlotAction::ZoomOut),
        KeyCode::Char('g') => Some(PlotAction::ToggleGrid),
        KeyCode::Char('a') => Some(PlotAction::ToggleAxes),
        KeyCode::Char('0') | KeyCode::Char('r') => Some(PlotAction::Reset),
        KeyCode::Char('q') | KeyCode::Esc => Some(PlotAction::Quit),
        _ => None,
    }
}

// =============================================================================
// ACTION POLLING
// =============================================================================

/// Poll for a plot action with timeout.
///
/// Returns None if no event arrived within the timeout or the event
/// does not map to an action.
pub fn poll_action(timeout: Duration) -> std::io::Result<Option<PlotAction>> {
    if poll(timeout)? {
        Ok(convert_event(read()?))
    } else {
        Ok(None)
    }
}

// =============================================================================
// TESTS
// =============================================================================
