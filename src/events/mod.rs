//! Events Module - Namespaced publish/subscribe channel
//!
//! The loose-coupling seam of the pipeline: components publish named
//! events (`expression:updated`, `state:changed`, ...) and subscribe to
//! the names they care about, without referencing each other.
//!
//! Dispatch guarantees:
//!
//! - listeners run in registration order, against a snapshot taken at
//!   publish time, so subscribing/unsubscribing mid-dispatch never
//!   affects the dispatch already underway
//! - a panicking listener is isolated and logged; the rest still run
//! - `once` listeners are removed right after their single invocation
//!
//! A bounded history ring keeps the most recent events for diagnostics.

use crate::state::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use tracing::error;

/// Maximum number of events kept in history.
pub const EVENT_HISTORY_CAP: usize = 100;

// =============================================================================
// Types
// =============================================================================

type Listener = Rc<dyn Fn(&Value)>;

struct ListenerEntry {
    id: usize,
    callback: Listener,
    once: bool,
}

type Registry = HashMap<String, Vec<ListenerEntry>>;

/// One published event, as kept in history.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub name: String,
    pub payload: Value,
}

/// Token that removes exactly one listener.
///
/// Dropping the token does nothing; the listener stays registered until
/// `unsubscribe` is called (or the token is converted into a cleanup
/// closure and that closure runs).
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Removes the listener this token was issued for.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Converts into a boxed cleanup closure for teardown lists.
    pub fn into_cancel(mut self) -> Box<dyn FnOnce()> {
        self.cancel.take().unwrap_or_else(|| Box::new(|| {}))
    }
}

// =============================================================================
// Channel
// =============================================================================

/// Namespaced pub/sub channel.
///
/// Constructed explicitly and shared as `Rc<EventChannel>`; there is no
/// global instance. Single-threaded by design.
pub struct EventChannel {
    /// Registry is behind its own `Rc` so unsubscribe tokens can reach it
    /// through a `Weak` without keeping the channel alive.
    listeners: Rc<RefCell<Registry>>,
    history: RefCell<VecDeque<EventRecord>>,
    next_id: Cell<usize>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(RefCell::new(HashMap::new())),
            history: RefCell::new(VecDeque::new()),
            next_id: Cell::new(0),
        }
    }

    /// Registers a listener for an event name.
    pub fn subscribe(&self, name: &str, callback: impl Fn(&Value) + 'static) -> Subscription {
        self.subscribe_entry(name, Rc::new(callback), false)
    }

    /// Registers a listener removed after its first invocation.
    pub fn subscribe_once(&self, name: &str, callback: impl Fn(&Value) + 'static) -> Subscription {
        self.subscribe_entry(name, Rc::new(callback), true)
    }

    fn subscribe_entry(&self, name: &str, callback: Listener, once: bool) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        self.listeners
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .push(ListenerEntry { id, callback, once });

        let registry = Rc::downgrade(&self.listeners);
        let name = name.to_string();
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                remove_listener(&mut registry.borrow_mut(), &name, id);
            }
        })
    }

    /// Publishes an event to all current listeners of `name`.
    ///
    /// The listener list is snapshotted before the first callback runs.
    pub fn publish(&self, name: &str, payload: &Value) {
        {
            let mut history = self.history.borrow_mut();
            history.push_back(EventRecord {
                name: name.to_string(),
                payload: payload.clone(),
            });
            while history.len() > EVENT_HISTORY_CAP {
                history.pop_front();
            }
        }

        let snapshot: Vec<(usize, Listener, bool)> = self
            .listeners
            .borrow()
            .get(name)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| (entry.id, entry.callback.clone(), entry.once))
                    .collect()
            })
            .unwrap_or_default();

        for (id, callback, once) in snapshot {
            // No registry borrow is held here: callbacks may publish or
            // (un)subscribe freely.
            if catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
                error!(event = %name, "event listener panicked");
            }
            if once {
                remove_listener(&mut self.listeners.borrow_mut(), name, id);
            }
        }
    }

    /// Number of listeners currently registered for a name.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.listeners
            .borrow()
            .get(name)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    /// Event names that currently have listeners, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.listeners.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// The most recent `n` events, oldest first.
    pub fn history(&self, n: usize) -> Vec<EventRecord> {
        let history = self.history.borrow();
        let skip = history.len().saturating_sub(n);
        history.iter().skip(skip).cloned().collect()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_listener(registry: &mut Registry, name: &str, id: usize) {
    if let Some(entries) = registry.get_mut(name) {
        entries.retain(|entry| entry.id != id);
        if entries.is_empty() {
            registry.remove(name);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
