//! StateStore - Hierarchical reactive application state
//!
//! A single tree of [`Value`] nodes addressed by dotted [`Path`]s:
//!
//! - **Writes**: [`StateStore::set`] with silent/merge variants, plus
//!   [`StateStore::update`] for batched multi-path writes
//! - **Change events**: `state:changed:<path>` and `state:changed` on the
//!   shared [`EventChannel`], published before subscriber callbacks run
//! - **Subscriptions**: per-path callbacks; a write notifies the written
//!   path first, then every ancestor path from nearest to farthest
//! - **Lifecycle**: [`StateStore::initialize`] seeds the tree from a
//!   [`GraphConfig`], [`StateStore::reset`] restores that seed
//!
//! Identical primitive writes are dropped before any bookkeeping, so
//! feedback loops (a subscriber writing back the value it just observed)
//! settle immediately.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::error;

use super::path::{Path, Segment};
use super::value::Value;
use crate::config::GraphConfig;
use crate::events::{EventChannel, Subscription};
use crate::types::Rgba;

/// Retained write records, oldest dropped first.
pub const STATE_HISTORY_CAP: usize = 50;

// =============================================================================
// Write Options & History
// =============================================================================

/// Behavior flags for [`StateStore::set_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Skip events and subscriber callbacks; the write still lands and is
    /// still recorded in history.
    pub silent: bool,
    /// Shallow-merge map values into an existing map instead of replacing it.
    pub merge: bool,
}

/// One recorded write, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub path: Path,
    /// `Value::Null` when the path did not exist before the write.
    pub old: Value,
    pub new: Value,
    pub timestamp_ms: u64,
}

struct SubscriberEntry {
    id: usize,
    callback: Rc<dyn Fn(&Value)>,
}

type SubscriberRegistry = HashMap<Path, Vec<SubscriberEntry>>;

// =============================================================================
// StateStore
// =============================================================================

pub struct StateStore {
    state: RefCell<Value>,
    // Own Rc so unsubscribe tokens can hold a Weak reference to the registry
    // without keeping the store alive.
    subscribers: Rc<RefCell<SubscriberRegistry>>,
    next_id: Cell<usize>,
    history: RefCell<VecDeque<HistoryEntry>>,
    /// Seed kept for [`StateStore::reset`].
    config: RefCell<Option<GraphConfig>>,
    channel: Rc<EventChannel>,
}

impl StateStore {
    /// Creates an empty store publishing on `channel`.
    pub fn new(channel: Rc<EventChannel>) -> Self {
        Self {
            state: RefCell::new(Value::Map(BTreeMap::new())),
            subscribers: Rc::new(RefCell::new(HashMap::new())),
            next_id: Cell::new(0),
            history: RefCell::new(VecDeque::new()),
            config: RefCell::new(None),
            channel,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Clone of the value at `path`, or `None` if any segment is missing.
    pub fn get(&self, path: &Path) -> Option<Value> {
        let state = self.state.borrow();
        get_in(&state, path.segments()).cloned()
    }

    /// Clone of the entire tree.
    pub fn snapshot(&self) -> Value {
        self.state.borrow().clone()
    }

    /// The most recent `count` writes, oldest first.
    pub fn history(&self, count: usize) -> Vec<HistoryEntry> {
        let history = self.history.borrow();
        let skip = history.len().saturating_sub(count);
        history.iter().skip(skip).cloned().collect()
    }

    /// Number of callbacks registered at exactly `path`.
    pub fn subscriber_count(&self, path: &Path) -> usize {
        self.subscribers
            .borrow()
            .get(path)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Writes `value` at `path`, creating intermediate containers as needed.
    ///
    /// Returns `false` when the write was dropped as a no-op (a primitive
    /// identical to the existing primitive).
    pub fn set(&self, path: &Path, value: Value) -> bool {
        self.set_with(path, value, SetOptions::default())
    }

    /// [`StateStore::set`] with explicit silent/merge behavior.
    pub fn set_with(&self, path: &Path, value: Value, options: SetOptions) -> bool {
        let old = {
            let state = self.state.borrow();
            get_in(&state, path.segments()).cloned()
        };

        if let Some(existing) = &old {
            if existing.is_primitive() && value.is_primitive() && *existing == value {
                return false;
            }
        }

        let effective = if options.merge {
            merge_value(old.as_ref(), value)
        } else {
            value
        };

        {
            let mut state = self.state.borrow_mut();
            set_in(&mut state, path.segments(), effective.clone());
        }
        self.record(path, old.clone(), effective.clone());

        if !options.silent {
            let payload = Value::object([
                ("path", Value::from(path.to_string())),
                ("old", old.unwrap_or(Value::Null)),
                ("new", effective.clone()),
            ]);
            self.channel.publish(&format!("state:changed:{path}"), &payload);
            self.channel.publish("state:changed", &payload);
            self.notify(path, &effective);
        }

        true
    }

    /// Applies every pair via silent set, then publishes one aggregate
    /// `state:updated` event listing the written paths. Per-path events and
    /// subscriber callbacks do not fire.
    pub fn update(&self, entries: impl IntoIterator<Item = (Path, Value)>) {
        let paths = self.apply_silent(entries);
        if paths.is_empty() {
            return;
        }
        let payload = Value::object([(
            "paths",
            Value::List(paths.into_iter().map(Value::from).collect()),
        )]);
        self.channel.publish("state:updated", &payload);
    }

    /// Batched silent writes with no aggregate event at all.
    pub fn update_silent(&self, entries: impl IntoIterator<Item = (Path, Value)>) {
        self.apply_silent(entries);
    }

    fn apply_silent(&self, entries: impl IntoIterator<Item = (Path, Value)>) -> Vec<String> {
        let mut paths = Vec::new();
        for (path, value) in entries {
            self.set_with(&path, value, SetOptions { silent: true, merge: false });
            paths.push(path.to_string());
        }
        paths
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Registers `callback` for writes at `path` (and for writes below it,
    /// which notify ancestors with their current subtree).
    pub fn subscribe(&self, path: &Path, callback: impl Fn(&Value) + 'static) -> Subscription {
        self.subscribe_rc(path, Rc::new(callback))
    }

    /// [`StateStore::subscribe`], plus one synchronous invocation with the
    /// current value (`Value::Null` when the path is missing) before the
    /// token is returned.
    pub fn subscribe_immediate(
        &self,
        path: &Path,
        callback: impl Fn(&Value) + 'static,
    ) -> Subscription {
        let callback: Rc<dyn Fn(&Value)> = Rc::new(callback);
        let token = self.subscribe_rc(path, callback.clone());
        let current = self.get(path).unwrap_or(Value::Null);
        Self::invoke(path, &[callback], &current);
        token
    }

    fn subscribe_rc(&self, path: &Path, callback: Rc<dyn Fn(&Value)>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.subscribers
            .borrow_mut()
            .entry(path.clone())
            .or_default()
            .push(SubscriberEntry { id, callback });

        let registry = Rc::downgrade(&self.subscribers);
        let path = path.clone();
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                remove_subscriber(&registry, &path, id);
            }
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Replaces the tree with one seeded from `config`, clears history, and
    /// publishes `state:initialized` with the fresh snapshot. Functions
    /// without a configured color are assigned one from the palette by index.
    pub fn initialize(&self, config: &GraphConfig) {
        *self.config.borrow_mut() = Some(config.clone());
        *self.state.borrow_mut() = build_tree(config);
        self.history.borrow_mut().clear();
        let snapshot = self.snapshot();
        self.channel.publish("state:initialized", &snapshot);
    }

    /// Restores the last initialized seed (or the default config when
    /// [`StateStore::initialize`] was never called) and publishes
    /// `state:reset` with the fresh snapshot.
    pub fn reset(&self) {
        let config = self.config.borrow().clone().unwrap_or_default();
        *self.state.borrow_mut() = build_tree(&config);
        self.history.borrow_mut().clear();
        let snapshot = self.snapshot();
        self.channel.publish("state:reset", &snapshot);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn record(&self, path: &Path, old: Option<Value>, new: Value) {
        let mut history = self.history.borrow_mut();
        history.push_back(HistoryEntry {
            path: path.clone(),
            old: old.unwrap_or(Value::Null),
            new,
            timestamp_ms: now_ms(),
        });
        while history.len() > STATE_HISTORY_CAP {
            history.pop_front();
        }
    }

    fn notify(&self, path: &Path, new_value: &Value) {
        Self::invoke(path, &self.callbacks_for(path), new_value);
        for ancestor in path.ancestors() {
            let callbacks = self.callbacks_for(&ancestor);
            if callbacks.is_empty() {
                continue;
            }
            // Ancestors observe their own current subtree, not the leaf value.
            let current = self.get(&ancestor).unwrap_or(Value::Null);
            Self::invoke(&ancestor, &callbacks, &current);
        }
    }

    /// Snapshot of the callbacks at `path`, taken outside any registry
    /// borrow so callbacks may freely write or (un)subscribe.
    fn callbacks_for(&self, path: &Path) -> Vec<Rc<dyn Fn(&Value)>> {
        self.subscribers
            .borrow()
            .get(path)
            .map(|entries| entries.iter().map(|entry| entry.callback.clone()).collect())
            .unwrap_or_default()
    }

    fn invoke(path: &Path, callbacks: &[Rc<dyn Fn(&Value)>], value: &Value) {
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
                error!(path = %path, "state subscriber panicked");
            }
        }
    }
}

fn remove_subscriber(registry: &RefCell<SubscriberRegistry>, path: &Path, id: usize) {
    let mut registry = registry.borrow_mut();
    if let Some(entries) = registry.get_mut(path) {
        entries.retain(|entry| entry.id != id);
        if entries.is_empty() {
            registry.remove(path);
        }
    }
}

// =============================================================================
// Tree Access
// =============================================================================

fn get_in<'a>(root: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Map(map)) => map.get(key)?,
            (Segment::Index(index), Value::List(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Writes `value` at the path described by `segments`, replacing any
/// non-container in the way. Lists are padded with `Value::Null` up to a
/// written index.
fn set_in(target: &mut Value, segments: &[Segment], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    match first {
        Segment::Key(key) => {
            if !matches!(target, Value::Map(_)) {
                *target = Value::Map(BTreeMap::new());
            }
            if let Value::Map(map) = target {
                let child = map.entry(key.clone()).or_insert(Value::Null);
                set_in(child, rest, value);
            }
        }
        Segment::Index(index) => {
            if !matches!(target, Value::List(_)) {
                *target = Value::List(Vec::new());
            }
            if let Value::List(items) = target {
                while items.len() <= *index {
                    items.push(Value::Null);
                }
                set_in(&mut items[*index], rest, value);
            }
        }
    }
}

fn merge_value(old: Option<&Value>, value: Value) -> Value {
    match (old, value) {
        (Some(Value::Map(existing)), Value::Map(incoming)) => {
            let mut merged = existing.clone();
            merged.extend(incoming);
            Value::Map(merged)
        }
        (_, value) => value,
    }
}

fn build_tree(config: &GraphConfig) -> Value {
    let functions = config
        .functions
        .iter()
        .enumerate()
        .map(|(index, function)| {
            let color = function
                .color
                .clone()
                .unwrap_or_else(|| Rgba::palette(index).to_hex());
            Value::object([
                ("id", Value::from(function.id.clone())),
                ("expression", Value::from(function.expression.clone())),
                ("color", Value::from(color)),
                ("visible", Value::from(function.visible.unwrap_or(true))),
                ("error", Value::Null),
            ])
        })
        .collect::<Vec<_>>();

    let controls = config
        .controls
        .iter()
        .map(|(name, value)| (name.clone(), Value::from(*value)))
        .collect::<BTreeMap<_, _>>();

    Value::object([
        ("functions", Value::List(functions)),
        (
            "viewport",
            Value::object([
                ("xMin", Value::from(config.graph.x_min)),
                ("xMax", Value::from(config.graph.x_max)),
                ("yMin", Value::from(config.graph.y_min)),
                ("yMax", Value::from(config.graph.y_max)),
            ]),
        ),
        (
            "graph",
            Value::object([
                ("showGrid", Value::from(config.graph.show_grid)),
                ("showAxes", Value::from(config.graph.show_axes)),
            ]),
        ),
        ("controls", Value::Map(controls)),
    ])
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FunctionConfig;

    fn setup() -> (Rc<EventChannel>, StateStore) {
        let channel = Rc::new(EventChannel::new());
        let store = StateStore::new(channel.clone());
        (channel, store)
    }

    fn count_events(channel: &EventChannel, name: &str) -> Rc<Cell<usize>> {
        let counter = Rc::new(Cell::new(0));
        let seen = counter.clone();
        let _token = channel.subscribe(name, move |_| seen.set(seen.get() + 1));
        counter
    }

    #[test]
    fn test_set_get_round_trip() {
        let (_, store) = setup();
        assert!(store.set(&Path::parse("user.name"), Value::from("Ada")));
        assert_eq!(store.get(&Path::parse("user.name")), Some(Value::from("Ada")));
        // Intermediate map was created on the way down.
        assert!(matches!(store.get(&Path::parse("user")), Some(Value::Map(_))));
        assert_eq!(store.get(&Path::parse("user.missing")), None);
    }

    #[test]
    fn test_identical_primitive_write_is_dropped() {
        let (channel, store) = setup();
        let changed = count_events(&channel, "state:changed");

        assert!(store.set(&Path::parse("a"), Value::from(1.0)));
        assert!(!store.set(&Path::parse("a"), Value::from(1.0)));
        assert!(store.set(&Path::parse("a"), Value::from(2.0)));

        assert_eq!(changed.get(), 2);
        assert_eq!(store.history(10).len(), 2);
    }

    #[test]
    fn test_container_writes_always_land() {
        let (channel, store) = setup();
        let changed = count_events(&channel, "state:changed");

        let object = Value::object([("x", Value::from(1.0))]);
        assert!(store.set(&Path::parse("a"), object.clone()));
        assert!(store.set(&Path::parse("a"), object));
        assert_eq!(changed.get(), 2);
    }

    #[test]
    fn test_merge_is_shallow() {
        let (_, store) = setup();
        let base = Path::parse("settings");
        store.set(
            &base,
            Value::object([("x", Value::from(1.0)), ("y", Value::from(2.0))]),
        );
        store.set_with(
            &base,
            Value::object([("y", Value::from(3.0)), ("z", Value::from(4.0))]),
            SetOptions { silent: false, merge: true },
        );

        assert_eq!(
            store.get(&base),
            Some(Value::object([
                ("x", Value::from(1.0)),
                ("y", Value::from(3.0)),
                ("z", Value::from(4.0)),
            ]))
        );

        // Merging into a missing or non-map value is a plain replace.
        store.set_with(
            &Path::parse("fresh"),
            Value::object([("a", Value::from(1.0))]),
            SetOptions { silent: false, merge: true },
        );
        assert_eq!(store.get(&Path::parse("fresh")), Some(Value::object([("a", Value::from(1.0))])));
    }

    #[test]
    fn test_silent_write_lands_without_events_or_callbacks() {
        let (channel, store) = setup();
        let changed = count_events(&channel, "state:changed");
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let _sub = store.subscribe(&Path::parse("a"), move |_| seen.set(seen.get() + 1));

        store.set_with(&Path::parse("a"), Value::from(5.0), SetOptions { silent: true, merge: false });

        assert_eq!(store.get(&Path::parse("a")), Some(Value::from(5.0)));
        assert_eq!(changed.get(), 0);
        assert_eq!(calls.get(), 0);
        assert_eq!(store.history(10).len(), 1);
    }

    #[test]
    fn test_change_event_payload() {
        let (channel, store) = setup();
        let payloads = Rc::new(RefCell::new(Vec::new()));
        let seen = payloads.clone();
        let _token = channel.subscribe("state:changed:user.name", move |payload| {
            seen.borrow_mut().push(payload.clone());
        });

        store.set(&Path::parse("user.name"), Value::from("Ada"));
        store.set(&Path::parse("user.name"), Value::from("Grace"));

        let payloads = payloads.borrow();
        assert_eq!(payloads.len(), 2);
        assert_eq!(
            payloads[0],
            Value::object([
                ("path", Value::from("user.name")),
                ("old", Value::Null),
                ("new", Value::from("Ada")),
            ])
        );
        assert_eq!(
            payloads[1],
            Value::object([
                ("path", Value::from("user.name")),
                ("old", Value::from("Ada")),
                ("new", Value::from("Grace")),
            ])
        );
    }

    #[test]
    fn test_direct_then_ancestors_nearest_first() {
        let (_, store) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));

        for watched in ["user.name", "user", "other"] {
            let seen = log.clone();
            let label = watched.to_string();
            let _token = store.subscribe(&Path::parse(watched), move |value| {
                seen.borrow_mut().push((label.clone(), value.clone()));
            });
        }

        store.set(&Path::parse("user.name"), Value::from("Ada"));

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].0, "user.name");
        assert_eq!(log[0].1, Value::from("Ada"));
        // The ancestor sees its current subtree, not the leaf value.
        assert_eq!(log[1].0, "user");
        assert_eq!(log[1].1, Value::object([("name", Value::from("Ada"))]));
    }

    #[test]
    fn test_unsubscribe_stops_callbacks() {
        let (_, store) = setup();
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let path = Path::parse("a");
        let token = store.subscribe(&path, move |_| seen.set(seen.get() + 1));

        store.set(&path, Value::from(1.0));
        token.unsubscribe();
        store.set(&path, Value::from(2.0));

        assert_eq!(calls.get(), 1);
        assert_eq!(store.subscriber_count(&path), 0);
    }

    #[test]
    fn test_subscribe_immediate() {
        let (_, store) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));

        // Missing path fires once with Null.
        let seen = log.clone();
        let _a = store.subscribe_immediate(&Path::parse("missing"), move |value| {
            seen.borrow_mut().push(value.clone());
        });
        assert_eq!(log.borrow().as_slice(), &[Value::Null]);

        // Existing path fires with the current value, then tracks writes.
        store.set(&Path::parse("a"), Value::from(1.0));
        let seen = log.clone();
        let _b = store.subscribe_immediate(&Path::parse("a"), move |value| {
            seen.borrow_mut().push(value.clone());
        });
        store.set(&Path::parse("a"), Value::from(2.0));

        assert_eq!(
            log.borrow().as_slice(),
            &[Value::Null, Value::from(1.0), Value::from(2.0)]
        );
    }

    #[test]
    fn test_update_publishes_single_aggregate_event() {
        let (channel, store) = setup();
        let changed = count_events(&channel, "state:changed");
        let updates = Rc::new(RefCell::new(Vec::new()));
        let seen = updates.clone();
        let _token = channel.subscribe("state:updated", move |payload| {
            seen.borrow_mut().push(payload.clone());
        });

        store.update([
            (Path::parse("a"), Value::from(1.0)),
            (Path::parse("b.c"), Value::from(2.0)),
        ]);

        assert_eq!(store.get(&Path::parse("a")), Some(Value::from(1.0)));
        assert_eq!(store.get(&Path::parse("b.c")), Some(Value::from(2.0)));
        assert_eq!(changed.get(), 0);
        assert_eq!(
            updates.borrow().as_slice(),
            &[Value::object([(
                "paths",
                Value::List(vec![Value::from("a"), Value::from("b.c")]),
            )])]
        );

        // Empty batches publish nothing.
        store.update([]);
        assert_eq!(updates.borrow().len(), 1);
    }

    #[test]
    fn test_update_silent_is_fully_quiet() {
        let (channel, store) = setup();
        let updated = count_events(&channel, "state:updated");
        store.update_silent([(Path::parse("a"), Value::from(1.0))]);
        assert_eq!(store.get(&Path::parse("a")), Some(Value::from(1.0)));
        assert_eq!(updated.get(), 0);
    }

    #[test]
    fn test_initialize_seeds_tree() {
        let (channel, store) = setup();
        let initialized = count_events(&channel, "state:initialized");

        let mut config = GraphConfig::default();
        let mut first = FunctionConfig::new("f1", "sin(x)");
        first.color = Some("#ff0000".to_string());
        config.functions.push(first);
        config.functions.push(FunctionConfig::new("f2", "a*x"));
        config.controls.insert("a".to_string(), 2.0);
        config.graph.x_min = -5.0;

        store.initialize(&config);

        assert_eq!(initialized.get(), 1);
        assert_eq!(
            store.get(&Path::parse("functions.0.color")),
            Some(Value::from("#ff0000"))
        );
        assert_eq!(
            store.get(&Path::parse("functions.1.color")),
            Some(Value::from(Rgba::palette(1).to_hex()))
        );
        assert_eq!(
            store.get(&Path::parse("functions.1.visible")),
            Some(Value::from(true))
        );
        assert_eq!(store.get(&Path::parse("functions.0.error")), Some(Value::Null));
        assert_eq!(store.get(&Path::parse("viewport.xMin")), Some(Value::from(-5.0)));
        assert_eq!(store.get(&Path::parse("graph.showGrid")), Some(Value::from(true)));
        assert_eq!(store.get(&Path::parse("controls.a")), Some(Value::from(2.0)));
    }

    #[test]
    fn test_reset_restores_seed() {
        let (channel, store) = setup();
        let resets = count_events(&channel, "state:reset");

        let mut config = GraphConfig::default();
        config.functions.push(FunctionConfig::new("f1", "x^2"));
        store.initialize(&config);
        let seeded = store.snapshot();

        store.set(&Path::parse("viewport.xMin"), Value::from(-3.0));
        store.set(&Path::parse("functions.0.visible"), Value::from(false));
        assert_ne!(store.snapshot(), seeded);

        store.reset();
        assert_eq!(store.snapshot(), seeded);
        assert_eq!(resets.get(), 1);
    }

    #[test]
    fn test_history_is_capped_and_ordered() {
        let (_, store) = setup();
        let path = Path::parse("n");
        for i in 0..(STATE_HISTORY_CAP + 5) {
            store.set(&path, Value::from(i as f64));
        }

        let history = store.history(STATE_HISTORY_CAP * 2);
        assert_eq!(history.len(), STATE_HISTORY_CAP);
        assert_eq!(history[0].new, Value::from(5.0));
        assert_eq!(history[0].old, Value::from(4.0));
        assert_eq!(
            history.last().map(|entry| entry.new.clone()),
            Some(Value::from((STATE_HISTORY_CAP + 4) as f64))
        );

        assert_eq!(store.history(2).len(), 2);
    }

    #[test]
    fn test_panicking_subscriber_does_not_block_others() {
        let (_, store) = setup();
        let path = Path::parse("a");
        let _bad = store.subscribe(&path, |_| panic!("boom"));
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let _good = store.subscribe(&path, move |_| seen.set(seen.get() + 1));

        store.set(&path, Value::from(1.0));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_intermediate_creation_rules() {
        let (_, store) = setup();

        // Numeric segments create lists padded with nulls.
        store.set(&Path::parse("items.2"), Value::from("c"));
        assert_eq!(
            store.get(&Path::parse("items")),
            Some(Value::List(vec![Value::Null, Value::Null, Value::from("c")]))
        );

        // A key segment through a scalar replaces it with a map.
        store.set(&Path::parse("a"), Value::from(5.0));
        store.set(&Path::parse("a.b"), Value::from(1.0));
        assert_eq!(store.get(&Path::parse("a")), Some(Value::object([("b", Value::from(1.0))])));
    }
}
