//! Save/destroy cycle error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors raised by the attachment store and its reconciliation cycles.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No backend set resolves for the record: no override, no persisted
    /// set, and an empty configured default. Raised before any adapter
    /// call; a collection with no reachable default is a hard
    /// misconfiguration.
    #[error("no resolvable backend set for collection '{collection}'")]
    NoResolvableBackends {
        /// The misconfigured collection.
        collection: String,
    },

    /// A backend name not present in the collection's configuration.
    #[error("unknown storage backend '{name}' for collection '{collection}'")]
    UnknownBackend {
        /// The unconfigured name token.
        name: String,
        /// The collection it was requested for.
        collection: String,
    },

    /// The store has no runtime for the named collection.
    #[error("collection '{0}' is not configured")]
    UnknownCollection(String),

    /// The record has no derived artifact with the given suffix.
    #[error("attachment has no thumbnail with suffix '{suffix}'")]
    UnknownThumbnail {
        /// The unmatched suffix.
        suffix: String,
    },

    /// An adapter call failed during a cycle phase; the persisted
    /// active-backend set keeps its last committed value.
    #[error("backend '{backend}' failed during {phase}: {source}")]
    Adapter {
        /// The failing backend name.
        backend: String,
        /// The cycle phase (e.g. "store", "delete", "fetch", "url").
        phase: &'static str,
        /// The underlying adapter error.
        source: BackendError,
    },

    /// A multi-backend rename stopped partway. Backends in `completed`
    /// already hold the new key and are not rolled back; the record's
    /// shadow filename stays set so a retried save resumes the rest.
    #[error(
        "rename to '{target}' incomplete: backend '{backend}' failed \
         after {} completed move(s): {source}", completed.len()
    )]
    Rename {
        /// The new key path.
        target: String,
        /// The backend whose move failed.
        backend: String,
        /// Backends moved before the failure.
        completed: Vec<String>,
        /// The underlying adapter error.
        source: BackendError,
    },

    /// A backend needs bytes but no payload was staged and no previously
    /// active backend could supply them.
    #[error("no payload available for '{key}'")]
    MissingPayload {
        /// The key that needed bytes.
        key: String,
    },

    /// Declarative settings failed validation.
    #[error("storage settings error: {0}")]
    Settings(#[from] stowage_shared::SettingsError),

    /// An adapter could not be constructed at configuration load.
    #[error("backend setup error: {0}")]
    Setup(#[from] BackendError),
}

impl StoreError {
    /// Create a no-resolvable-backends error.
    #[must_use]
    pub fn no_resolvable_backends(collection: impl Into<String>) -> Self {
        Self::NoResolvableBackends {
            collection: collection.into(),
        }
    }

    /// Create an unknown-backend error.
    #[must_use]
    pub fn unknown_backend(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::UnknownBackend {
            name: name.into(),
            collection: collection.into(),
        }
    }

    /// Create an adapter-failure error.
    #[must_use]
    pub fn adapter(backend: impl Into<String>, phase: &'static str, source: BackendError) -> Self {
        Self::Adapter {
            backend: backend.into(),
            phase,
            source,
        }
    }

    /// Create a missing-payload error.
    #[must_use]
    pub fn missing_payload(key: impl Into<String>) -> Self {
        Self::MissingPayload { key: key.into() }
    }
}
