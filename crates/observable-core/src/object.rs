//! Keyed object container.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::change::{Change, ChangeKind, Fault, MutationError, TargetId};
use crate::dispatch::dispatch;
use crate::intercept::{run_chain, Outcome};
use crate::registry::{Disposer, Registry};

/// Observable keyed object backed by an insertion-ordered JSON map.
///
/// Handles are cheap clones sharing one store; mutations from inside a
/// listener run their own full interception/apply/dispatch cycle depth-first.
#[derive(Clone)]
pub struct ObservableObject {
    inner: Rc<Inner>,
}

struct Inner {
    id: TargetId,
    storage: RefCell<Map<String, Value>>,
    listeners: Registry,
}

impl ObservableObject {
    pub fn new() -> Self {
        Self::from_map(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        ObservableObject {
            inner: Rc::new(Inner {
                id: TargetId::next(),
                storage: RefCell::new(map),
                listeners: Registry::new(),
            }),
        }
    }

    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.storage.borrow().get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.storage.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.storage.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.storage.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.storage.borrow().is_empty()
    }

    /// Current state as a JSON value, key order preserved.
    pub fn view(&self) -> Value {
        Value::Object(self.inner.storage.borrow().clone())
    }

    /// Sets `key` to `value` through the mutation pipeline. Emits `add` when
    /// the key did not previously exist and `update` when it did; prior
    /// existence is what distinguishes the two, not value equality.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<Outcome, MutationError> {
        let key = key.into();
        let draft = {
            let storage = self.inner.storage.borrow();
            match storage.get(&key) {
                Some(old) => ChangeKind::ObjectUpdate {
                    key: key.clone(),
                    new_value: value,
                    old_value: old.clone(),
                },
                None => ChangeKind::ObjectAdd {
                    key: key.clone(),
                    new_value: value,
                },
            }
        };
        let Some(event) = run_chain(&self.inner.listeners, Change::new(self.inner.id, draft))?
        else {
            return Ok(Outcome::Vetoed);
        };
        match event.kind() {
            ChangeKind::ObjectAdd { key, new_value }
            | ChangeKind::ObjectUpdate { key, new_value, .. } => {
                self.inner
                    .storage
                    .borrow_mut()
                    .insert(key.clone(), new_value.clone());
            }
            _ => unreachable!("interception preserves the event kind"),
        }
        dispatch(&self.inner.listeners, &event);
        Ok(Outcome::Applied)
    }

    /// Registers a container-scope interceptor for every mutation of this
    /// object.
    pub fn intercept<F>(&self, interceptor: F) -> Disposer
    where
        F: Fn(Change) -> Result<Option<Change>, Fault> + 'static,
    {
        self.inner.listeners.add_interceptor(Box::new(interceptor))
    }

    /// Registers an interceptor for mutations of a single key. Keyed
    /// interceptors run after every container-scope interceptor.
    pub fn intercept_key<F>(&self, key: &str, interceptor: F) -> Disposer
    where
        F: Fn(Change) -> Result<Option<Change>, Fault> + 'static,
    {
        self.inner
            .listeners
            .add_key_interceptor(key, Box::new(interceptor))
    }

    /// Registers a container-scope observer, notified after each commit.
    pub fn observe<F>(&self, observer: F) -> Disposer
    where
        F: Fn(&Change) -> Result<(), Fault> + 'static,
    {
        self.inner.listeners.add_observer(Box::new(observer))
    }

    /// Registers an observer for commits touching a single key.
    pub fn observe_key<F>(&self, key: &str, observer: F) -> Disposer
    where
        F: Fn(&Change) -> Result<(), Fault> + 'static,
    {
        self.inner.listeners.add_key_observer(key, Box::new(observer))
    }
}

impl Default for ObservableObject {
    fn default() -> Self {
        Self::new()
    }
}
