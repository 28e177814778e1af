//! Listener registry: message type -> set of callbacks.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

/// A callback for one message type.
///
/// Identity is the allocation: clones of a `Listener` are the same listener,
/// two `Listener::new` calls with identical closures are not.
#[derive(Clone)]
pub struct Listener(Arc<dyn Fn(&Value) + Send + Sync>);

impl Listener {
    pub fn new(f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, payload: &Value) {
        (self.0)(payload)
    }

    pub fn same_as(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Shared registry. Cloning shares the same table.
#[derive(Clone, Default)]
pub struct Registry {
    listeners: Arc<Mutex<HashMap<String, Vec<Listener>>>>,
}

impl Registry {
    fn table(&self) -> MutexGuard<'_, HashMap<String, Vec<Listener>>> {
        // The lock is never held across listener calls, so a poisoned table is still consistent.
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `listener` for `kind`. Returns `false` if it was already registered.
    pub fn add(&self, kind: &str, listener: Listener) -> bool {
        let mut table = self.table();
        let entry = table.entry(kind.to_string()).or_default();
        if entry.iter().any(|l| l.same_as(&listener)) {
            return false;
        }
        entry.push(listener);
        true
    }

    /// Deregister `listener` from `kind`. Returns `false` if it was not registered.
    pub fn remove(&self, kind: &str, listener: &Listener) -> bool {
        let mut table = self.table();
        let Some(entry) = table.get_mut(kind) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|l| !l.same_as(listener));
        let removed = entry.len() != before;
        if entry.is_empty() {
            table.remove(kind);
        }
        removed
    }

    pub fn len(&self, kind: &str) -> usize {
        self.table().get(kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Listeners for `kind` at this instant.
    pub fn snapshot(&self, kind: &str) -> Vec<Listener> {
        self.table().get(kind).cloned().unwrap_or_default()
    }

    /// Call every listener registered for `kind` with `payload`.
    ///
    /// Listeners run on a snapshot taken before the first call, so they may
    /// register or deregister freely; changes apply from the next dispatch.
    /// A panicking listener stops dispatch of this message to the remaining
    /// listeners. The panic is logged and not propagated.
    ///
    /// Returns the number of listeners that ran to completion.
    pub fn dispatch(&self, kind: &str, payload: &Value) -> usize {
        let listeners = self.snapshot(kind);
        let mut completed = 0;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            for listener in &listeners {
                listener.call(payload);
                completed += 1;
            }
        }));
        if outcome.is_err() {
            crate::log_error!(
                "listener for `{}` panicked; {} remaining listener(s) skipped",
                kind,
                listeners.len() - completed - 1
            );
        }
        completed
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table();
        let mut map = f.debug_map();
        for (kind, listeners) in table.iter() {
            map.entry(kind, &listeners.len());
        }
        map.finish()
    }
}
