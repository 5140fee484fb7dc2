//! Post-commit observer delivery.

use tracing::warn;

use crate::change::{Change, Fault, TargetId};
use crate::registry::Registry;
use crate::spy::{self, SpyEvent};

/// Delivers a committed event: container-scope observers first, then
/// keyed-scope observers, each in registration order (snapshot at entry).
///
/// Dispatch is synchronous and immediate per commit, independent of any
/// batching context a surrounding runtime may maintain. One observer's fault
/// is contained and reported; later observers still run, and nothing
/// unwinds into the mutating caller since the mutation is already applied.
pub(crate) fn dispatch(registry: &Registry, event: &Change) {
    let chain = registry.observer_chain(event.key());
    for entry in chain {
        if !entry.is_active() {
            continue;
        }
        if let Err(fault) = (entry.callback)(event) {
            report_observer_fault(event.target(), fault);
        }
    }
}

/// Containment path for a fault raised by observer logic, shared with the
/// synthesized immediate invocation on boxed observables.
pub(crate) fn report_observer_fault(target: TargetId, fault: Fault) {
    warn!(
        observable = target.as_u64(),
        fault = %fault,
        "observer fault contained; delivery to remaining observers continues"
    );
    spy::report(&SpyEvent::ObserverFault { target, fault });
}
