//! Thread-local diagnostics channel.
//!
//! Spies receive what ordinary listeners never see: boxed-observable
//! creation events and reports of contained observer faults. The channel is
//! thread-local, matching the single-threaded cooperative model of the rest
//! of the core.

use crate::change::{Change, Fault, TargetId};
use crate::registry::{Disposer, ListenerSet};

pub(crate) type SpyFn = dyn Fn(&SpyEvent);

thread_local! {
    static SPIES: ListenerSet<SpyFn> = ListenerSet::new();
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpyEvent {
    /// A container came into existence. Currently emitted for boxed
    /// observables only; the carried change is a `create` event.
    Created(Change),
    /// An observer fault was contained during dispatch.
    ObserverFault { target: TargetId, fault: Fault },
}

/// Registers a diagnostics listener for the current thread.
pub fn spy<F>(listener: F) -> Disposer
where
    F: Fn(&SpyEvent) + 'static,
{
    SPIES.with(|spies| spies.register(Box::new(listener)))
}

pub(crate) fn report(event: &SpyEvent) {
    let chain = SPIES.with(|spies| spies.snapshot());
    for entry in chain {
        if entry.is_active() {
            (entry.callback)(event);
        }
    }
}
