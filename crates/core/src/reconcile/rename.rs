//! Multi-backend rename coordination.

use tracing::warn;

use super::error::StoreError;
use crate::backend::{BackendAdapter, BackendError, BackendRegistry};
use crate::keys::ObjectKey;

fn rename_error(
    completed: &[String],
    backend: &str,
    new: &ObjectKey,
    old: &ObjectKey,
    source: BackendError,
) -> StoreError {
    warn!(
        backend,
        old_key = %old.path,
        new_key = %new.path,
        moved = completed.len(),
        "rename stopped partway; shadow filename retained for retry"
    );
    StoreError::Rename {
        target: new.path.clone(),
        backend: backend.to_string(),
        completed: completed.to_vec(),
        source,
    }
}

/// Move an object from `old` to `new` on every listed backend.
///
/// Moves run sequentially; on the first failure the error carries the
/// names already moved, which are **not** rolled back — the caller keeps
/// the shadow filename so a retried save resumes the remaining moves.
/// A backend whose new key already exists while the old key is gone is
/// treated as moved (a resumed rename must not duplicate completed
/// moves).
pub(crate) async fn rename_on_backends(
    registry: &BackendRegistry,
    backends: &[String],
    old: &ObjectKey,
    new: &ObjectKey,
) -> Result<Vec<String>, StoreError> {
    let mut completed: Vec<String> = Vec::new();

    for name in backends {
        let adapter = registry
            .get(name)
            .ok_or_else(|| StoreError::unknown_backend(name, &old.collection))?;

        let new_exists = match adapter.exists(new).await {
            Ok(v) => v,
            Err(source) => return Err(rename_error(&completed, name, new, old, source)),
        };
        let old_exists = match adapter.exists(old).await {
            Ok(v) => v,
            Err(source) => return Err(rename_error(&completed, name, new, old, source)),
        };

        if new_exists && !old_exists {
            // Already moved by an earlier, partially failed cycle.
            completed.push(name.clone());
            continue;
        }

        match adapter.rename(old, new).await {
            Ok(()) => completed.push(name.clone()),
            Err(source) => return Err(rename_error(&completed, name, new, old, source)),
        }
    }

    Ok(completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::StagedPayload;
    use crate::backend::{BackendAdapter, MemoryAdapter};
    use std::collections::HashMap;
    use std::sync::Arc;
    use uuid::Uuid;

    fn keys() -> (ObjectKey, ObjectKey) {
        let id = Uuid::new_v4();
        (
            ObjectKey::derive("documents", None, id, "a.png", None),
            ObjectKey::derive("documents", None, id, "b.png", None),
        )
    }

    fn registry_with(names: &[&str]) -> (BackendRegistry, HashMap<String, Arc<MemoryAdapter>>) {
        let mut registry = BackendRegistry::new();
        let mut adapters = HashMap::new();
        for name in names {
            let adapter = Arc::new(MemoryAdapter::new());
            registry.register(*name, adapter.clone() as Arc<dyn BackendAdapter>);
            adapters.insert((*name).to_string(), adapter);
        }
        (registry, adapters)
    }

    #[tokio::test]
    async fn test_rename_moves_every_backend() {
        let (registry, adapters) = registry_with(&["fs1", "fs2"]);
        let (old, new) = keys();
        let payload = StagedPayload::from_bytes(&b"img"[..], "image/png");
        for adapter in adapters.values() {
            adapter.store(&old, &payload).await.expect("seed");
        }

        let names = vec!["fs1".to_string(), "fs2".to_string()];
        let completed = rename_on_backends(&registry, &names, &old, &new)
            .await
            .expect("rename");

        assert_eq!(completed, names);
        for adapter in adapters.values() {
            assert!(!adapter.contains(&old.path));
            assert!(adapter.contains(&new.path));
        }
    }

    #[tokio::test]
    async fn test_resumed_rename_skips_completed_moves() {
        let (registry, adapters) = registry_with(&["fs1", "fs2"]);
        let (old, new) = keys();
        let payload = StagedPayload::from_bytes(&b"img"[..], "image/png");

        // fs1 already moved in a previous, partially failed cycle.
        adapters["fs1"].store(&new, &payload).await.expect("seed");
        adapters["fs2"].store(&old, &payload).await.expect("seed");

        let names = vec!["fs1".to_string(), "fs2".to_string()];
        rename_on_backends(&registry, &names, &old, &new)
            .await
            .expect("rename");

        // fs1 was not renamed again (journal shows no rename call).
        let fs1_ops: Vec<&'static str> =
            adapters["fs1"].operations().iter().map(|o| o.op).collect();
        assert!(!fs1_ops.contains(&"rename"));
        assert!(adapters["fs2"].contains(&new.path));
    }

    #[tokio::test]
    async fn test_partial_failure_reports_completed_backends() {
        let (registry, adapters) = registry_with(&["fs1", "fs2"]);
        let (old, new) = keys();
        let payload = StagedPayload::from_bytes(&b"img"[..], "image/png");
        // Only fs1 holds data; fs2's rename will fail with NotFound.
        adapters["fs1"].store(&old, &payload).await.expect("seed");

        let names = vec!["fs1".to_string(), "fs2".to_string()];
        let err = rename_on_backends(&registry, &names, &old, &new)
            .await
            .unwrap_err();

        match err {
            StoreError::Rename {
                completed, backend, ..
            } => {
                assert_eq!(completed, vec!["fs1".to_string()]);
                assert_eq!(backend, "fs2");
            }
            other => panic!("expected rename error, got {other}"),
        }
        // fs1's completed move is not rolled back.
        assert!(adapters["fs1"].contains(&new.path));
    }
}
