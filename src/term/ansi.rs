//! ANSI Escape Sequences - Low-level terminal control
//!
//! Thin `write!` wrappers over the escape codes the presenter uses.
//! Everything is generic over `W: Write` so a frame can be assembled in
//! an in-memory buffer and flushed to the terminal in one syscall.

use std::io::Write;

use crate::types::Rgba;

// =============================================================================
// Cursor
// =============================================================================

/// Move cursor to (x, y). Zero-indexed; the terminal itself is 1-indexed.
#[inline]
pub fn cursor_to<W: Write>(w: &mut W, x: u16, y: u16) -> std::io::Result<()> {
    write!(w, "\x1b[{};{}H", y + 1, x + 1)
}

/// Hide the cursor.
#[inline]
pub fn cursor_hide<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?25l")
}

/// Show the cursor.
#[inline]
pub fn cursor_show<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?25h")
}

// =============================================================================
// Screen
// =============================================================================

/// Switch to the alternate screen buffer.
#[inline]
pub fn enter_alt_screen<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?1049h")
}

/// Return to the main screen buffer.
#[inline]
pub fn exit_alt_screen<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?1049l")
}

/// Wipe the screen and scrollback, parking the cursor at home.
#[inline]
pub fn clear_screen<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[2J\x1b[3J\x1b[H")
}

// =============================================================================
// Synchronized Updates
// =============================================================================

/// Open a synchronized update; the terminal holds output until
/// [`end_sync`], so a frame appears all at once instead of tearing.
#[inline]
pub fn begin_sync<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?2026h")
}

/// Close a synchronized update, releasing the held output.
#[inline]
pub fn end_sync<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?2026l")
}

// =============================================================================
// Colors
// =============================================================================

/// Drop attributes and colors back to the terminal default.
#[inline]
pub fn reset<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[0m")
}

/// Set the foreground to a 24-bit color.
///
/// Alpha is ignored; terminals have no blending.
#[inline]
pub fn fg_rgb<W: Write>(w: &mut W, color: Rgba) -> std::io::Result<()> {
    // TrueColor: 38;2;r;g;b
    write!(w, "\x1b[38;2;{};{};{}m", color.r, color.g, color.b)
}

// =============================================================================
// Tests
// =============================================================================
