//! Single boxed value container.
//!
//! A box holds exactly one value with no property dimension. Its observers
//! use the positional `(new_value, old_value)` presentation instead of a
//! structured event; internally every replacement still flows through the
//! same event pipeline as the other container shapes.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::change::{Change, ChangeKind, Fault, MutationError, TargetId};
use crate::dispatch::{dispatch, report_observer_fault};
use crate::intercept::{run_chain, Outcome};
use crate::registry::{Disposer, Registry};
use crate::spy::{self, SpyEvent};

/// Observable boxed value. Handles are cheap clones sharing one store.
#[derive(Clone)]
pub struct ObservableBox {
    inner: Rc<Inner>,
}

struct Inner {
    id: TargetId,
    storage: RefCell<Value>,
    listeners: Registry,
}

impl ObservableBox {
    /// Creates a box holding `value`. Construction emits a `create` event on
    /// the spy channel only; interceptors and ordinary observers never see
    /// it.
    pub fn new(value: Value) -> Self {
        let id = TargetId::next();
        let created = Change::new(
            id,
            ChangeKind::BoxCreate {
                new_value: value.clone(),
            },
        );
        let boxed = ObservableBox {
            inner: Rc::new(Inner {
                id,
                storage: RefCell::new(value),
                listeners: Registry::new(),
            }),
        };
        spy::report(&SpyEvent::Created(created));
        boxed
    }

    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    pub fn get(&self) -> Value {
        self.inner.storage.borrow().clone()
    }

    /// Replaces the boxed value through the mutation pipeline. Fires on
    /// every replacement; value equality is deliberately not checked, so
    /// assigning an identical value still notifies. Callers wanting equality
    /// suppression compare before writing.
    pub fn set(&self, value: Value) -> Result<Outcome, MutationError> {
        let draft = ChangeKind::BoxUpdate {
            new_value: value,
            old_value: self.inner.storage.borrow().clone(),
        };
        let Some(event) = run_chain(&self.inner.listeners, Change::new(self.inner.id, draft))?
        else {
            return Ok(Outcome::Vetoed);
        };
        match event.kind() {
            ChangeKind::BoxUpdate { new_value, .. } => {
                *self.inner.storage.borrow_mut() = new_value.clone();
            }
            _ => unreachable!("interception preserves the event kind"),
        }
        dispatch(&self.inner.listeners, &event);
        Ok(Outcome::Applied)
    }

    pub fn intercept<F>(&self, interceptor: F) -> Disposer
    where
        F: Fn(Change) -> Result<Option<Change>, Fault> + 'static,
    {
        self.inner.listeners.add_interceptor(Box::new(interceptor))
    }

    /// Registers a positional observer called with `(new_value, old_value)`
    /// after each replacement.
    pub fn observe<F>(&self, observer: F) -> Disposer
    where
        F: Fn(&Value, Option<&Value>) -> Result<(), Fault> + 'static,
    {
        self.observe_with(observer, false)
    }

    /// Like [`ObservableBox::observe`]; when `invoke_immediately` is set,
    /// synthesizes one initial call with the current value and no old value
    /// before any subsequent update is delivered. A fault from the
    /// synthesized call is contained the same way as any observer fault.
    pub fn observe_with<F>(&self, observer: F, invoke_immediately: bool) -> Disposer
    where
        F: Fn(&Value, Option<&Value>) -> Result<(), Fault> + 'static,
    {
        let observer = Rc::new(observer);
        let delegate = Rc::clone(&observer);
        let disposer = self
            .inner
            .listeners
            .add_observer(Box::new(move |change: &Change| match change.kind() {
                ChangeKind::BoxUpdate {
                    new_value,
                    old_value,
                } => delegate(new_value, Some(old_value)),
                _ => Ok(()),
            }));
        if invoke_immediately {
            let current = self.inner.storage.borrow().clone();
            if let Err(fault) = observer(&current, None) {
                report_observer_fault(self.inner.id, fault);
            }
        }
        disposer
    }
}
