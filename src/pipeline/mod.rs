//! Reactive Pipeline
//!
//! This module connects the state tree and event channel to the raster
//! surface.
//!
//! # Pipeline Architecture
//!
//! ```text
//! edits (functions ops) → store/channel → RenderScheduler → RasterSurface
//!                                       ↘ debounced parameter scan ↗
//! ```
//!
//! ## Data Flow
//!
//! 1. **functions** - editing operations that write state and publish events
//! 2. **timing** - the cooperative scheduler everything defers work through
//! 3. **scheduler** - coalesced render passes, deferred error writes,
//!    parameter auto-detection, viewport persistence

pub mod functions;
pub mod scheduler;
pub mod timing;

// Re-exports
pub use functions::{
    add_function, function_index, remove_function, set_color, set_control, set_visible,
    update_expression,
};
pub use scheduler::{
    FrameOutcome, RenderScheduler, SchedulerOptions, DEFAULT_CONTROL_VALUE,
};
pub use timing::{Debouncer, FrameCoalescer, TaskHandle, TaskTimer};
