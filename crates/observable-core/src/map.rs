//! Ordered map container.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::change::{Change, ChangeKind, Fault, MutationError, TargetId};
use crate::dispatch::dispatch;
use crate::intercept::{run_chain, Outcome};
use crate::registry::{Disposer, Registry};

/// Observable ordered map. Keys keep insertion order across updates;
/// handles are cheap clones sharing one store.
#[derive(Clone)]
pub struct ObservableMap {
    inner: Rc<Inner>,
}

struct Inner {
    id: TargetId,
    storage: RefCell<IndexMap<String, Value>>,
    listeners: Registry,
}

impl ObservableMap {
    pub fn new() -> Self {
        ObservableMap {
            inner: Rc::new(Inner {
                id: TargetId::next(),
                storage: RefCell::new(IndexMap::new()),
                listeners: Registry::new(),
            }),
        }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        let map = ObservableMap::new();
        map.inner.storage.borrow_mut().extend(entries);
        map
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

    /// Current state as a JSON object, entry order preserved.
    pub fn view(&self) -> Value {
        let storage = self.inner.storage.borrow();
        let mut map = Map::with_capacity(storage.len());
        for (key, value) in storage.iter() {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    /// Sets `key` to `value` through the mutation pipeline. Emits `add` when
    /// the key was absent and `update` when it existed.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Result<Outcome, MutationError> {
        let key = key.into();
        let draft = {
            let storage = self.inner.storage.borrow();
            match storage.get(&key) {
                Some(old) => ChangeKind::MapUpdate {
                    key: key.clone(),
                    new_value: value,
                    old_value: old.clone(),
                },
                None => ChangeKind::MapAdd {
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
            ChangeKind::MapAdd { key, new_value }
            | ChangeKind::MapUpdate { key, new_value, .. } => {
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

    /// Removes `key` through the mutation pipeline, returning the removed
    /// value. Deleting an absent key emits nothing and returns `Ok(None)`;
    /// a vetoed delete also returns `Ok(None)` with the entry left in place.
    pub fn delete(&self, key: &str) -> Result<Option<Value>, MutationError> {
        let draft = {
            let storage = self.inner.storage.borrow();
            match storage.get(key) {
                Some(old) => ChangeKind::MapDelete {
                    key: key.to_owned(),
                    old_value: old.clone(),
                },
                None => return Ok(None),
            }
        };
        let Some(event) = run_chain(&self.inner.listeners, Change::new(self.inner.id, draft))?
        else {
            return Ok(None);
        };
        let removed = match event.kind() {
            ChangeKind::MapDelete { key, .. } => {
                self.inner.storage.borrow_mut().shift_remove(key.as_str())
            }
            _ => unreachable!("interception preserves the event kind"),
        };
        dispatch(&self.inner.listeners, &event);
        Ok(removed)
    }

    pub fn intercept<F>(&self, interceptor: F) -> Disposer
    where
        F: Fn(Change) -> Result<Option<Change>, Fault> + 'static,
    {
        self.inner.listeners.add_interceptor(Box::new(interceptor))
    }

    /// Keyed interceptors run after every container-scope interceptor and
    /// also see `delete` events for their key.
    pub fn intercept_key<F>(&self, key: &str, interceptor: F) -> Disposer
    where
        F: Fn(Change) -> Result<Option<Change>, Fault> + 'static,
    {
        self.inner
            .listeners
            .add_key_interceptor(key, Box::new(interceptor))
    }

    pub fn observe<F>(&self, observer: F) -> Disposer
    where
        F: Fn(&Change) -> Result<(), Fault> + 'static,
    {
        self.inner.listeners.add_observer(Box::new(observer))
    }

    pub fn observe_key<F>(&self, key: &str, observer: F) -> Disposer
    where
        F: Fn(&Change) -> Result<(), Fault> + 'static,
    {
        self.inner.listeners.add_key_observer(key, Box::new(observer))
    }
}

impl Default for ObservableMap {
    fn default() -> Self {
        Self::new()
    }
}
