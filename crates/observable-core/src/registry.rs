//! Listener bookkeeping: ordered entries, snapshots, disposers.
//!
//! Each container owns one [`Registry`] inside its shared state, so listener
//! lifetime is bounded by the container itself. Iteration uses
//! snapshot-at-entry semantics: a dispatch pass sees the live entries that
//! existed when it started, re-checks liveness immediately before each
//! invocation, and never sees entries registered during the pass.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::change::{Change, Fault};

pub(crate) type InterceptorFn = dyn Fn(Change) -> Result<Option<Change>, Fault>;
pub(crate) type ObserverFn = dyn Fn(&Change) -> Result<(), Fault>;

/// Revocation capability returned by every registration.
///
/// Disposal is idempotent and takes effect immediately, including from
/// inside a listener while a dispatch over the same target is in flight.
/// Dropping a disposer without calling it leaves the listener registered.
#[derive(Debug, Clone)]
pub struct Disposer {
    active: Rc<Cell<bool>>,
}

impl Disposer {
    pub fn dispose(&self) {
        self.active.set(false);
    }

    pub fn is_disposed(&self) -> bool {
        !self.active.get()
    }
}

pub(crate) struct Entry<F: ?Sized> {
    active: Rc<Cell<bool>>,
    pub(crate) callback: Box<F>,
}

impl<F: ?Sized> Entry<F> {
    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }
}

/// One ordered sequence of listeners for a single (target, scope) pair.
pub(crate) struct ListenerSet<F: ?Sized> {
    entries: RefCell<Vec<Rc<Entry<F>>>>,
}

impl<F: ?Sized> ListenerSet<F> {
    pub(crate) fn new() -> Self {
        ListenerSet {
            entries: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn register(&self, callback: Box<F>) -> Disposer {
        let active = Rc::new(Cell::new(true));
        let mut entries = self.entries.borrow_mut();
        // Disposal only flips the flag; dead entries are swept here so the
        // list stays bounded by the number of live registrations.
        entries.retain(|entry| entry.is_active());
        entries.push(Rc::new(Entry {
            active: Rc::clone(&active),
            callback,
        }));
        Disposer { active }
    }

    /// Registration-order copy of the live entries at the moment a dispatch
    /// pass begins. Entries revoked after the snapshot are skipped by the
    /// per-entry liveness check at invocation time.
    pub(crate) fn snapshot(&self) -> Vec<Rc<Entry<F>>> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.is_active())
            .cloned()
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.borrow().iter().all(|entry| !entry.is_active())
    }
}

/// Per-target listener registry: container-scope sequences plus lazily
/// created keyed sequences for containers with a property dimension.
pub(crate) struct Registry {
    interceptors: ListenerSet<InterceptorFn>,
    observers: ListenerSet<ObserverFn>,
    key_interceptors: RefCell<HashMap<String, Rc<ListenerSet<InterceptorFn>>>>,
    key_observers: RefCell<HashMap<String, Rc<ListenerSet<ObserverFn>>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry {
            interceptors: ListenerSet::new(),
            observers: ListenerSet::new(),
            key_interceptors: RefCell::new(HashMap::new()),
            key_observers: RefCell::new(HashMap::new()),
        }
    }

    pub(crate) fn add_interceptor(&self, callback: Box<InterceptorFn>) -> Disposer {
        self.interceptors.register(callback)
    }

    pub(crate) fn add_observer(&self, callback: Box<ObserverFn>) -> Disposer {
        self.observers.register(callback)
    }

    pub(crate) fn add_key_interceptor(&self, key: &str, callback: Box<InterceptorFn>) -> Disposer {
        keyed_set(&self.key_interceptors, key).register(callback)
    }

    pub(crate) fn add_key_observer(&self, key: &str, callback: Box<ObserverFn>) -> Disposer {
        keyed_set(&self.key_observers, key).register(callback)
    }

    /// Chain snapshot for one interception pass: container scope first, then
    /// the keyed scope when the event carries a property key. The
    /// concatenation order is fixed regardless of registration time.
    pub(crate) fn interceptor_chain(&self, key: Option<&str>) -> Vec<Rc<Entry<InterceptorFn>>> {
        let mut chain = self.interceptors.snapshot();
        if let Some(key) = key {
            let keyed = self.key_interceptors.borrow().get(key).cloned();
            if let Some(set) = keyed {
                chain.extend(set.snapshot());
            }
        }
        chain
    }

    /// Dispatch snapshot, mirroring [`Registry::interceptor_chain`] ordering.
    pub(crate) fn observer_chain(&self, key: Option<&str>) -> Vec<Rc<Entry<ObserverFn>>> {
        let mut chain = self.observers.snapshot();
        if let Some(key) = key {
            let keyed = self.key_observers.borrow().get(key).cloned();
            if let Some(set) = keyed {
                chain.extend(set.snapshot());
            }
        }
        chain
    }
}

fn keyed_set<F: ?Sized>(
    map: &RefCell<HashMap<String, Rc<ListenerSet<F>>>>,
    key: &str,
) -> Rc<ListenerSet<F>> {
    let mut map = map.borrow_mut();
    map.retain(|_, set| !set.is_empty());
    Rc::clone(
        map.entry(key.to_owned())
            .or_insert_with(|| Rc::new(ListenerSet::new())),
    )
}
