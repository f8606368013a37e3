//! State Module - Hierarchical reactive application state
//!
//! This module contains the state tree every other system reads and writes:
//!
//! - **Value** - JSON-shaped dynamic value (null, bool, number, string, list, map)
//! - **Path** - Typed dotted address into the tree (`functions.0.error`)
//! - **Store** - The tree itself: get/set/update, per-path subscriptions,
//!   change events, write history, config lifecycle

mod path;
mod store;
mod value;

pub use path::*;
pub use store::*;
pub use value::*;
