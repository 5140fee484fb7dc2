//! Pre-commit interception: a chain-of-responsibility fold over a draft event.

use tracing::trace;

use crate::change::{verify_rewrite, Change, MutationError};
use crate::registry::Registry;

/// How a mutating operation that reached the pipeline concluded.
///
/// A veto is a silent no-op, not an error: the write simply does not happen
/// and no observer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Vetoed,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn is_vetoed(self) -> bool {
        matches!(self, Outcome::Vetoed)
    }
}

/// Folds `draft` through the interceptor chain for its target.
///
/// Container-scope interceptors run before keyed-scope interceptors for all
/// registration orderings. Each step receives the event produced by the
/// previous one and returns `Ok(Some(event))` to proceed, `Ok(None)` to veto,
/// or `Err(fault)` to abort. An empty chain accepts the draft unchanged.
///
/// Runs strictly before any storage write, so a veto or fault leaves the
/// container exactly as it was.
pub(crate) fn run_chain(
    registry: &Registry,
    draft: Change,
) -> Result<Option<Change>, MutationError> {
    let chain = registry.interceptor_chain(draft.key());
    let mut event = draft;
    for entry in chain {
        // Revocation from inside an earlier interceptor takes effect
        // mid-chain, before this entry is invoked.
        if !entry.is_active() {
            continue;
        }
        let prev = event.clone();
        match (entry.callback)(event) {
            Ok(Some(next)) => {
                verify_rewrite(&prev, &next)?;
                event = next;
            }
            Ok(None) => {
                trace!(
                    observable = prev.target().as_u64(),
                    event = prev.describe(),
                    "mutation vetoed by interceptor"
                );
                return Ok(None);
            }
            Err(fault) => return Err(MutationError::Intercepted(fault)),
        }
    }
    Ok(Some(event))
}
