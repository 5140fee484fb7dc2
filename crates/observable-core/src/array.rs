//! Dynamic array container.
//!
//! Every structural edit (insert, remove, replace-range) is normalized to a
//! single splice event; in-place replacement of one index is an update
//! event. Arrays have no property dimension, so only container-scope
//! listeners apply.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::change::{Change, ChangeKind, Fault, MutationError, TargetId};
use crate::dispatch::dispatch;
use crate::intercept::{run_chain, Outcome};
use crate::registry::{Disposer, Registry};

/// Observable dynamic array. Handles are cheap clones sharing one store.
#[derive(Clone)]
pub struct ObservableArray {
    inner: Rc<Inner>,
}

struct Inner {
    id: TargetId,
    storage: RefCell<Vec<Value>>,
    listeners: Registry,
}

impl ObservableArray {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(values: Vec<Value>) -> Self {
        ObservableArray {
            inner: Rc::new(Inner {
                id: TargetId::next(),
                storage: RefCell::new(values),
                listeners: Registry::new(),
            }),
        }
    }

    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.storage.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.storage.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.storage.borrow().is_empty()
    }

    pub fn view(&self) -> Value {
        Value::Array(self.inner.storage.borrow().clone())
    }

    /// Replaces the value at `index` in place through the mutation pipeline.
    /// Fails before interception when the index is out of bounds.
    pub fn set(&self, index: usize, value: Value) -> Result<Outcome, MutationError> {
        let draft = {
            let storage = self.inner.storage.borrow();
            let old = storage
                .get(index)
                .ok_or(MutationError::IndexOutOfBounds {
                    index,
                    len: storage.len(),
                })?
                .clone();
            ChangeKind::ArrayUpdate {
                index,
                new_value: value,
                old_value: old,
            }
        };
        let Some(event) = run_chain(&self.inner.listeners, Change::new(self.inner.id, draft))?
        else {
            return Ok(Outcome::Vetoed);
        };
        match event.kind() {
            ChangeKind::ArrayUpdate {
                index, new_value, ..
            } => {
                if let Some(slot) = self.inner.storage.borrow_mut().get_mut(*index) {
                    *slot = new_value.clone();
                }
            }
            _ => unreachable!("interception preserves the event kind"),
        }
        dispatch(&self.inner.listeners, &event);
        Ok(Outcome::Applied)
    }

    /// Removes `removed_count` elements at `index` and inserts `added` in
    /// their place, as one event. Positions are clamped to the current
    /// length. A splice that removes nothing and adds nothing emits nothing.
    ///
    /// Interceptors may rewrite `removed_count` and `added`; the event's
    /// `removed` elements are captured from storage when the accepted event
    /// is applied, so observers see what was actually taken out.
    pub fn splice(
        &self,
        index: usize,
        removed_count: usize,
        added: Vec<Value>,
    ) -> Result<Outcome, MutationError> {
        let draft = {
            let storage = self.inner.storage.borrow();
            let len = storage.len();
            let index = index.min(len);
            let removed_count = removed_count.min(len - index);
            if removed_count == 0 && added.is_empty() {
                return Ok(Outcome::Applied);
            }
            ChangeKind::Splice {
                index,
                removed_count,
                added,
                removed: Vec::new(),
            }
        };
        let Some(mut event) = run_chain(&self.inner.listeners, Change::new(self.inner.id, draft))?
        else {
            return Ok(Outcome::Vetoed);
        };
        match event.kind_mut() {
            ChangeKind::Splice {
                index,
                removed_count,
                added,
                removed,
            } => {
                let mut storage = self.inner.storage.borrow_mut();
                let start = (*index).min(storage.len());
                let end = (start + *removed_count).min(storage.len());
                *removed = storage.splice(start..end, added.iter().cloned()).collect();
                *removed_count = removed.len();
            }
            _ => unreachable!("interception preserves the event kind"),
        }
        dispatch(&self.inner.listeners, &event);
        Ok(Outcome::Applied)
    }

    /// Appends one element; `splice(len, 0, [value])`.
    pub fn push(&self, value: Value) -> Result<Outcome, MutationError> {
        let len = self.len();
        self.splice(len, 0, vec![value])
    }

    /// Removes the last element, if any; a no-op on an empty array.
    pub fn pop(&self) -> Result<Outcome, MutationError> {
        let len = self.len();
        if len == 0 {
            return Ok(Outcome::Applied);
        }
        self.splice(len - 1, 1, Vec::new())
    }

    /// Inserts one element at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, value: Value) -> Result<Outcome, MutationError> {
        self.splice(index, 0, vec![value])
    }

    /// Removes the element at `index`. Fails before interception when the
    /// index is out of bounds.
    pub fn remove(&self, index: usize) -> Result<Outcome, MutationError> {
        let len = self.len();
        if index >= len {
            return Err(MutationError::IndexOutOfBounds { index, len });
        }
        self.splice(index, 1, Vec::new())
    }

    /// Removes every element as one splice.
    pub fn clear(&self) -> Result<Outcome, MutationError> {
        let len = self.len();
        self.splice(0, len, Vec::new())
    }

    pub fn intercept<F>(&self, interceptor: F) -> Disposer
    where
        F: Fn(Change) -> Result<Option<Change>, Fault> + 'static,
    {
        self.inner.listeners.add_interceptor(Box::new(interceptor))
    }

    pub fn observe<F>(&self, observer: F) -> Disposer
    where
        F: Fn(&Change) -> Result<(), Fault> + 'static,
    {
        self.inner.listeners.add_observer(Box::new(observer))
    }
}

impl Default for ObservableArray {
    fn default() -> Self {
        Self::new()
    }
}
