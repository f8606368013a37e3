//! # spark-plot
//!
//! Reactive expression-to-plot pipeline for terminals.
//!
//! Type a formula, see the curve: expressions are parsed and cached,
//! their free symbols become adjustable parameters, and every state
//! change flows through a frame-coalescing scheduler that redraws a
//! braille canvas.
//!
//! ## Architecture
//!
//! The pipeline is event-driven end to end:
//! ```text
//! edits → StateStore / EventChannel → RenderScheduler → RasterSurface → terminal
//! ```
//!
//! State lives in one hierarchical tree (`functions`, `controls`,
//! `viewport`, `graph`). Anything that writes the tree triggers the
//! scheduler; the scheduler coalesces bursts into single frames and
//! defers its own writes (evaluation errors, detected parameters) so a
//! render pass never mutates mid-draw.
//!
//! ## Modules
//!
//! - [`expr`] - Expression parsing, caching, compilation, evaluation
//! - [`state`] - Hierarchical reactive state tree
//! - [`events`] - Namespaced pub/sub event channel
//! - [`pipeline`] - Render scheduling, timers, function management
//! - [`viewport`] - Domain window and pixel mapping
//! - [`surface`] - Drawing surface abstraction
//! - [`term`] - Braille terminal backend
//! - [`config`] - Graph configuration (serde)
//! - [`types`] - Core types (Rgba, Stroke)

pub mod config;
pub mod events;
pub mod expr;
pub mod pipeline;
pub mod state;
pub mod surface;
pub mod term;
pub mod types;
pub mod viewport;

// Re-export commonly used items
pub use types::*;

pub use config::{FunctionConfig, GraphConfig, GraphSettings};

pub use events::{EventChannel, EventRecord, Subscription};

pub use expr::{
    CompiledExpression, Compiler, EvalError, Evaluator, Expr, ExprError, ExprSource, PRIMARY_VAR,
    SECONDARY_VAR, Scope, detect_variables, evaluate, get_all_variables, is_assignment_expression,
    is_single_variable, parse_expression,
};

pub use state::{HistoryEntry, Path, Segment, SetOptions, StateStore, Value};

pub use pipeline::{
    DEFAULT_CONTROL_VALUE, Debouncer, FrameCoalescer, FrameOutcome, RenderScheduler,
    SchedulerOptions, TaskHandle, TaskTimer, add_function, function_index, remove_function,
    set_color, set_control, set_visible, update_expression,
};

pub use surface::RasterSurface;

pub use term::{BrailleCanvas, PlotAction, TermPresenter, TermSurface};

pub use viewport::{DEFAULT_GRID_SPACING_PX, Viewport, grid_step};
