//! Core primitives for observable-rs.
//!
//! An observable-mutation interception and notification core: external code
//! can observe, and optionally veto or rewrite, mutations made to shared
//! containers before and after they take effect. Four container shapes share
//! one event pipeline — keyed object, dynamic array, ordered map, and single
//! boxed value. A mutation request builds a draft [`Change`], runs it
//! through the interceptor chain (container scope, then property scope),
//! applies the accepted event to storage, and only then notifies observers
//! in the same scope order.
//!
//! The model is single-threaded and cooperative: callbacks run synchronously
//! on the caller's thread, and a callback may itself mutate observables —
//! each nested mutation completes its own full cycle depth-first. Dependency
//! tracking, reaction scheduling, and transaction batching belong to a
//! surrounding runtime, not to this core; dispatch here is immediate per
//! commit.

pub mod array;
pub mod boxed;
pub mod change;
pub mod map;
pub mod object;
pub mod spy;

mod dispatch;
mod intercept;
mod registry;

pub use array::ObservableArray;
pub use boxed::ObservableBox;
pub use change::{Change, ChangeKind, Fault, MutationError, TargetId};
pub use intercept::Outcome;
pub use map::ObservableMap;
pub use object::ObservableObject;
pub use registry::Disposer;
pub use spy::{spy, SpyEvent};

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
