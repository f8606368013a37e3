//! Function Operations - Editing the plotted function list
//!
//! Free functions over the injected store/channel that keep the
//! `functions` and `controls` subtrees consistent: palette color
//! assignment, per-keystroke validation into the `error` field, and the
//! `expression:updated` / `controls:updated` events the render scheduler
//! reacts to.

use crate::events::EventChannel;
use crate::expr::Compiler;
use crate::state::{Path, SetOptions, StateStore, Value};
use crate::types::Rgba;

/// Index of the function with the given id in the `functions` list.
pub fn function_index(store: &StateStore, id: &str) -> Option<usize> {
    let functions = store.get(&Path::functions())?;
    let list = functions.as_list()?;
    list.iter().position(|entry| {
        entry.as_map().and_then(|map| map.get("id")).and_then(Value::as_str) == Some(id)
    })
}

/// Clone of the `functions` list, empty when the path is missing.
pub(crate) fn functions_list(store: &StateStore) -> Vec<Value> {
    store
        .get(&Path::functions())
        .and_then(|value| value.as_list().map(<[Value]>::to_vec))
        .unwrap_or_default()
}

/// Appends a function with a palette color picked by index, `visible: true`,
/// and the expression validated into the `error` field. If the id already
/// exists this degrades to [`update_expression`]. Returns the entry's index.
pub fn add_function(
    store: &StateStore,
    channel: &EventChannel,
    compiler: &Compiler,
    id: impl Into<String>,
    expression: impl Into<String>,
) -> usize {
    let id = id.into();
    let expression = expression.into();
    if let Some(index) = function_index(store, &id) {
        update_expression(store, channel, compiler, &id, expression);
        return index;
    }

    let mut functions = functions_list(store);
    let index = functions.len();
    let error = validation_error(compiler, &expression);
    functions.push(Value::object([
        ("id", Value::from(id.clone())),
        ("expression", Value::from(expression.clone())),
        ("color", Value::from(Rgba::palette(index).to_hex())),
        ("visible", Value::from(true)),
        ("error", error),
    ]));
    store.set(&Path::functions(), Value::List(functions));

    publish_expression_updated(channel, &id, Some(&expression));
    index
}

/// Rewrites a function's expression, revalidating it into the `error`
/// field. Other fields (color, visibility) are untouched. Returns `false`
/// when no function has the given id.
pub fn update_expression(
    store: &StateStore,
    channel: &EventChannel,
    compiler: &Compiler,
    id: &str,
    expression: impl Into<String>,
) -> bool {
    let Some(index) = function_index(store, id) else {
        return false;
    };
    let expression = expression.into();
    let error = validation_error(compiler, &expression);
    store.set_with(
        &Path::functions().index(index),
        Value::object([
            ("expression", Value::from(expression.clone())),
            ("error", error),
        ]),
        SetOptions { silent: false, merge: true },
    );

    publish_expression_updated(channel, id, Some(&expression));
    true
}

/// Removes a function; later entries shift down. Returns `false` when no
/// function has the given id.
pub fn remove_function(store: &StateStore, channel: &EventChannel, id: &str) -> bool {
    let Some(index) = function_index(store, id) else {
        return false;
    };
    let mut functions = functions_list(store);
    functions.remove(index);
    store.set(&Path::functions(), Value::List(functions));

    publish_expression_updated(channel, id, None);
    true
}

/// Toggles a function's visibility. Returns `false` for unknown ids.
pub fn set_visible(store: &StateStore, id: &str, visible: bool) -> bool {
    let Some(index) = function_index(store, id) else {
        return false;
    };
    store.set(
        &Path::functions().index(index).key("visible"),
        Value::from(visible),
    );
    true
}

/// Recolors a function. Returns `false` for unknown ids.
pub fn set_color(store: &StateStore, id: &str, color: Rgba) -> bool {
    let Some(index) = function_index(store, id) else {
        return false;
    };
    store.set(
        &Path::functions().index(index).key("color"),
        Value::from(color.to_hex()),
    );
    true
}

/// Writes a control parameter and publishes `controls:updated`. Writing a
/// value identical to the current one publishes nothing.
pub fn set_control(store: &StateStore, channel: &EventChannel, name: &str, value: f64) {
    if store.set(&Path::controls().key(name), Value::from(value)) {
        channel.publish(
            "controls:updated",
            &Value::object([
                ("name", Value::from(name)),
                ("value", Value::from(value)),
            ]),
        );
    }
}

/// Compile-checks `expression` and returns the message destined for the
/// function's `error` field (`Null` when it is fine). Blank text is a blank
/// entry, not an error.
fn validation_error(compiler: &Compiler, expression: &str) -> Value {
    if expression.trim().is_empty() {
        return Value::Null;
    }
    match compiler.parse(expression, None) {
        Ok(compiled) if compiled.is_valid => Value::Null,
        Ok(compiled) => compiled.error.map(Value::from).unwrap_or(Value::Null),
        Err(err) => Value::from(err.to_string()),
    }
}

fn publish_expression_updated(channel: &EventChannel, id: &str, expression: Option<&str>) {
    let mut payload = vec![("id", Value::from(id))];
    if let Some(expression) = expression {
        payload.push(("expression", Value::from(expression)));
    }
    channel.publish("expression:updated", &Value::object(payload));
}

// =============================================================================
// Tests
// =============================================================================
