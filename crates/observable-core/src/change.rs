//! Mutation event model shared by every container shape.
//!
//! One mutation is described by one [`Change`]: the identity of the container
//! it targets plus a [`ChangeKind`] variant for the (container, mutation)
//! pair. Interceptors receive the event by value and may rewrite only the
//! fields the variant marks as rewritable; everything else is validated when
//! the interceptor returns.

use std::cell::Cell;

use serde_json::Value;
use thiserror::Error;

thread_local! {
    static NEXT_TARGET_ID: Cell<u64> = Cell::new(1);
}

/// Identity of an observable container, unique within a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(u64);

impl TargetId {
    pub(crate) fn next() -> Self {
        NEXT_TARGET_ID.with(|counter| {
            let id = counter.get();
            counter.set(id.saturating_add(1));
            TargetId(id)
        })
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// A fault raised by interceptor or observer logic.
///
/// Pre-commit faults abort the mutation attempt ([`MutationError::Intercepted`]);
/// post-commit faults are contained per observer and reported to the spy
/// channel instead of unwinding into the mutating caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Fault(String);

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Fault(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Error returned by a mutating container operation.
///
/// A veto is not an error; vetoed operations return
/// [`Outcome::Vetoed`](crate::Outcome::Vetoed). Every `MutationError`
/// guarantees that container storage is exactly as it was before the attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    #[error("interceptor fault: {0}")]
    Intercepted(#[from] Fault),
    #[error("interceptor replaced a {expected} event with a {actual} event")]
    KindChanged {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("interceptor rewrote read-only field `{field}` of a {kind} event")]
    ReadOnlyField {
        kind: &'static str,
        field: &'static str,
    },
    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// One proposed or committed mutation.
///
/// The target identity and the variant tag are fixed at draft construction;
/// interceptors rewrite fields through [`Change::kind_mut`] and hand the
/// event back, and the chain faults if anything read-only moved.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    target: TargetId,
    kind: ChangeKind,
}

/// Tagged union over (container kind, mutation kind).
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    /// A key that did not previously exist on an object.
    ObjectAdd { key: String, new_value: Value },
    /// Replacement of an existing object key. Distinguished from `ObjectAdd`
    /// by prior key existence, not value equality.
    ObjectUpdate {
        key: String,
        new_value: Value,
        old_value: Value,
    },
    /// One normalized structural array edit: remove `removed_count` elements
    /// at `index`, insert `added` in their place. `removed` is captured from
    /// storage when the accepted event is applied, so it reflects the final
    /// `removed_count` after interception.
    Splice {
        index: usize,
        removed_count: usize,
        added: Vec<Value>,
        removed: Vec<Value>,
    },
    /// Single-index value replacement with no length change.
    ArrayUpdate {
        index: usize,
        new_value: Value,
        old_value: Value,
    },
    MapAdd { key: String, new_value: Value },
    MapUpdate {
        key: String,
        new_value: Value,
        old_value: Value,
    },
    /// Removal of an existing map key. Deleting an absent key emits nothing.
    MapDelete { key: String, old_value: Value },
    /// Construction of a boxed observable. Delivered to the spy channel
    /// only, never to interceptors or ordinary observers.
    BoxCreate { new_value: Value },
    /// Boxed value replacement. Fires even when the new value equals the old
    /// one; equality suppression is the caller's business.
    BoxUpdate { new_value: Value, old_value: Value },
}

impl Change {
    pub(crate) fn new(target: TargetId, kind: ChangeKind) -> Self {
        Change { target, kind }
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn kind(&self) -> &ChangeKind {
        &self.kind
    }

    /// Mutable access for interceptors. Rewrites of read-only fields are
    /// detected when the interceptor returns and fault the whole attempt.
    pub fn kind_mut(&mut self) -> &mut ChangeKind {
        &mut self.kind
    }

    /// Property key carried by the event, when the variant has one.
    /// Array and box events have no property dimension.
    pub fn key(&self) -> Option<&str> {
        self.kind.key()
    }

    pub fn describe(&self) -> &'static str {
        self.kind.describe()
    }
}

impl ChangeKind {
    /// Mutation kind tag, shared across container shapes.
    pub fn tag(&self) -> &'static str {
        match self {
            ChangeKind::ObjectAdd { .. } | ChangeKind::MapAdd { .. } => "add",
            ChangeKind::ObjectUpdate { .. }
            | ChangeKind::ArrayUpdate { .. }
            | ChangeKind::MapUpdate { .. }
            | ChangeKind::BoxUpdate { .. } => "update",
            ChangeKind::Splice { .. } => "splice",
            ChangeKind::MapDelete { .. } => "delete",
            ChangeKind::BoxCreate { .. } => "create",
        }
    }

    /// Container shape the event belongs to.
    pub fn container(&self) -> &'static str {
        match self {
            ChangeKind::ObjectAdd { .. } | ChangeKind::ObjectUpdate { .. } => "object",
            ChangeKind::Splice { .. } | ChangeKind::ArrayUpdate { .. } => "array",
            ChangeKind::MapAdd { .. }
            | ChangeKind::MapUpdate { .. }
            | ChangeKind::MapDelete { .. } => "map",
            ChangeKind::BoxCreate { .. } | ChangeKind::BoxUpdate { .. } => "box",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ChangeKind::ObjectAdd { .. } => "object add",
            ChangeKind::ObjectUpdate { .. } => "object update",
            ChangeKind::Splice { .. } => "array splice",
            ChangeKind::ArrayUpdate { .. } => "array update",
            ChangeKind::MapAdd { .. } => "map add",
            ChangeKind::MapUpdate { .. } => "map update",
            ChangeKind::MapDelete { .. } => "map delete",
            ChangeKind::BoxCreate { .. } => "box create",
            ChangeKind::BoxUpdate { .. } => "box update",
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            ChangeKind::ObjectAdd { key, .. }
            | ChangeKind::ObjectUpdate { key, .. }
            | ChangeKind::MapAdd { key, .. }
            | ChangeKind::MapUpdate { key, .. }
            | ChangeKind::MapDelete { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn new_value(&self) -> Option<&Value> {
        match self {
            ChangeKind::ObjectAdd { new_value, .. }
            | ChangeKind::ObjectUpdate { new_value, .. }
            | ChangeKind::ArrayUpdate { new_value, .. }
            | ChangeKind::MapAdd { new_value, .. }
            | ChangeKind::MapUpdate { new_value, .. }
            | ChangeKind::BoxCreate { new_value }
            | ChangeKind::BoxUpdate { new_value, .. } => Some(new_value),
            ChangeKind::Splice { .. } | ChangeKind::MapDelete { .. } => None,
        }
    }

    pub fn old_value(&self) -> Option<&Value> {
        match self {
            ChangeKind::ObjectUpdate { old_value, .. }
            | ChangeKind::ArrayUpdate { old_value, .. }
            | ChangeKind::MapUpdate { old_value, .. }
            | ChangeKind::MapDelete { old_value, .. }
            | ChangeKind::BoxUpdate { old_value, .. } => Some(old_value),
            _ => None,
        }
    }

    /// Number of elements a splice inserts, derived from `added`.
    pub fn add_count(&self) -> Option<usize> {
        match self {
            ChangeKind::Splice { added, .. } => Some(added.len()),
            _ => None,
        }
    }
}

/// Validates the event an interceptor handed back against the one it was
/// given: same target, same variant, and only rewritable fields moved.
pub(crate) fn verify_rewrite(prev: &Change, next: &Change) -> Result<(), MutationError> {
    let kind = prev.kind.describe();
    if next.target != prev.target {
        return Err(MutationError::ReadOnlyField {
            kind,
            field: "target",
        });
    }
    use ChangeKind::*;
    match (&prev.kind, &next.kind) {
        (ObjectAdd { key: pk, .. }, ObjectAdd { key: nk, .. }) => {
            field_unchanged(kind, "key", pk == nk)
        }
        (
            ObjectUpdate {
                key: pk,
                old_value: po,
                ..
            },
            ObjectUpdate {
                key: nk,
                old_value: no,
                ..
            },
        ) => {
            field_unchanged(kind, "key", pk == nk)?;
            field_unchanged(kind, "old_value", po == no)
        }
        (
            Splice {
                index: pi,
                removed: pr,
                ..
            },
            Splice {
                index: ni,
                removed: nr,
                ..
            },
        ) => {
            field_unchanged(kind, "index", pi == ni)?;
            field_unchanged(kind, "removed", pr == nr)
        }
        (
            ArrayUpdate {
                index: pi,
                old_value: po,
                ..
            },
            ArrayUpdate {
                index: ni,
                old_value: no,
                ..
            },
        ) => {
            field_unchanged(kind, "index", pi == ni)?;
            field_unchanged(kind, "old_value", po == no)
        }
        (MapAdd { key: pk, .. }, MapAdd { key: nk, .. }) => field_unchanged(kind, "key", pk == nk),
        (
            MapUpdate {
                key: pk,
                old_value: po,
                ..
            },
            MapUpdate {
                key: nk,
                old_value: no,
                ..
            },
        ) => {
            field_unchanged(kind, "key", pk == nk)?;
            field_unchanged(kind, "old_value", po == no)
        }
        (
            MapDelete {
                key: pk,
                old_value: po,
            },
            MapDelete {
                key: nk,
                old_value: no,
            },
        ) => {
            field_unchanged(kind, "key", pk == nk)?;
            field_unchanged(kind, "old_value", po == no)
        }
        // Create events never enter the chain; nothing on them is rewritable.
        (BoxCreate { new_value: pv }, BoxCreate { new_value: nv }) => {
            field_unchanged(kind, "new_value", pv == nv)
        }
        (BoxUpdate { old_value: po, .. }, BoxUpdate { old_value: no, .. }) => {
            field_unchanged(kind, "old_value", po == no)
        }
        (_, _) => Err(MutationError::KindChanged {
            expected: kind,
            actual: next.kind.describe(),
        }),
    }
}

fn field_unchanged(
    kind: &'static str,
    field: &'static str,
    unchanged: bool,
) -> Result<(), MutationError> {
    if unchanged {
        Ok(())
    } else {
        Err(MutationError::ReadOnlyField { kind, field })
    }
}
