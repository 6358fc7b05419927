//! In-process memory adapter.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::adapter::BackendAdapter;
use super::error::BackendError;
use crate::attachment::StagedPayload;
use crate::keys::ObjectKey;

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// The invoked method name.
    pub op: &'static str,
    /// The canonical key path the call addressed.
    pub key: String,
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Bytes,
    content_type: String,
}

/// Memory-backed storage keyed by canonical path.
///
/// Suitable for tests and ephemeral deployments. Every call is recorded
/// in an operation journal so tests can assert on call counts and
/// ordering (including the zero-calls case).
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    objects: Mutex<HashMap<String, StoredObject>>,
    journal: Mutex<Vec<Operation>>,
}

impl MemoryAdapter {
    /// Create an empty adapter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, op: &'static str, key: &ObjectKey) {
        self.journal
            .lock()
            .expect("journal lock poisoned")
            .push(Operation {
                op,
                key: key.path.clone(),
            });
    }

    /// Snapshot of the recorded operations, oldest first.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.journal.lock().expect("journal lock poisoned").clone()
    }

    /// Number of stored objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.lock().expect("objects lock poisoned").len()
    }

    /// Whether an object is present under the canonical `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.objects
            .lock()
            .expect("objects lock poisoned")
            .contains_key(path)
    }
}

#[async_trait]
impl BackendAdapter for MemoryAdapter {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn store(&self, key: &ObjectKey, payload: &StagedPayload) -> Result<(), BackendError> {
        self.record("store", key);
        self.objects.lock().expect("objects lock poisoned").insert(
            key.path.clone(),
            StoredObject {
                bytes: payload.bytes(),
                content_type: payload.content_type().to_string(),
            },
        );
        Ok(())
    }

    async fn fetch(&self, key: &ObjectKey) -> Result<Bytes, BackendError> {
        self.record("fetch", key);
        self.objects
            .lock()
            .expect("objects lock poisoned")
            .get(&key.path)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| BackendError::not_found(&key.path))
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), BackendError> {
        self.record("delete", key);
        self.objects
            .lock()
            .expect("objects lock poisoned")
            .remove(&key.path)
            .map(|_| ())
            .ok_or_else(|| BackendError::not_found(&key.path))
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, BackendError> {
        self.record("exists", key);
        Ok(self.contains(&key.path))
    }

    async fn rename(&self, old: &ObjectKey, new: &ObjectKey) -> Result<(), BackendError> {
        self.record("rename", old);
        let mut objects = self.objects.lock().expect("objects lock poisoned");
        match objects.remove(&old.path) {
            Some(object) => {
                objects.insert(new.path.clone(), object);
                Ok(())
            }
            None => Err(BackendError::not_found(&old.path)),
        }
    }

    fn location(&self, key: &ObjectKey) -> String {
        format!("memory://{}", key.path)
    }

    fn public_url(&self, _key: &ObjectKey) -> Result<String, BackendError> {
        Err(BackendError::unsupported("public_url"))
    }
}
