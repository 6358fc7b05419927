//! Backend selection policy.
//!
//! Resolves the effective set of active backend names for one save cycle:
//! an explicit override wins, then the record's previously persisted set,
//! then the collection's configured defaults. An empty result is a hard
//! configuration error raised before any adapter is touched.

use crate::backend::BackendRegistry;
use crate::reconcile::StoreError;

/// Resolve the target backend set for a save cycle.
///
/// Resolution order: `override_names` if given, else `previous` if the
/// record was stored before, else `defaults`. The result is
/// de-duplicated preserving first-seen order, checked non-empty, and
/// every name is validated against the collection's dispatch table.
///
/// # Errors
///
/// Returns [`StoreError::NoResolvableBackends`] when resolution yields an
/// empty set and [`StoreError::UnknownBackend`] when a resolved name has
/// no configured adapter. Both fire before any I/O.
pub fn resolve_active_set(
    collection: &str,
    override_names: Option<&[String]>,
    previous: &[String],
    defaults: &[String],
    registry: &BackendRegistry,
) -> Result<Vec<String>, StoreError> {
    let candidates: &[String] = match override_names {
        Some(names) => names,
        None if !previous.is_empty() => previous,
        None => defaults,
    };

    let mut resolved: Vec<String> = Vec::with_capacity(candidates.len());
    for name in candidates {
        if !resolved.contains(name) {
            resolved.push(name.clone());
        }
    }

    if resolved.is_empty() {
        return Err(StoreError::no_resolvable_backends(collection));
    }
    for name in &resolved {
        if !registry.contains(name) {
            return Err(StoreError::unknown_backend(name, collection));
        }
    }
    Ok(resolved)
}
