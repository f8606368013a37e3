//! Configuration contract.
//!
//! The external, already-validated object the state tree is seeded from.
//! Field names serialize camelCase so the JSON form matches the state
//! tree's key names (`xMin`, `showGrid`, ...).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Full graph configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
    /// Plotted functions, in draw order.
    pub functions: Vec<FunctionConfig>,
    pub graph: GraphSettings,
    /// Parameter name -> value.
    pub controls: BTreeMap<String, f64>,
}

/// One configured function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionConfig {
    pub id: String,
    pub expression: String,
    /// Hex color string; assigned from the palette when absent.
    #[serde(default)]
    pub color: Option<String>,
    /// Defaults to visible.
    #[serde(default)]
    pub visible: Option<bool>,
}

impl FunctionConfig {
    pub fn new(id: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            expression: expression.into(),
            color: None,
            visible: None,
        }
    }
}

/// Initial viewport and display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphSettings {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub show_grid: bool,
    pub show_axes: bool,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            x_min: -10.0,
            x_max: 10.0,
            y_min: -10.0,
            y_max: 10.0,
            show_grid: true,
            show_axes: true,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
