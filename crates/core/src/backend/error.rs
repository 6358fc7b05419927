//! Backend adapter error types.

use thiserror::Error;

/// Errors surfaced by storage backend adapters.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Object not found under the given key.
    #[error("object not found: {key}")]
    NotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// Operation not supported by this backend.
    #[error("operation '{operation}' not supported by storage backend")]
    Unsupported {
        /// The unsupported operation.
        operation: &'static str,
    },

    /// Backend configuration error.
    #[error("backend configuration error: {0}")]
    Configuration(String),

    /// Filesystem I/O failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend operation failure (network, service-side).
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl BackendError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an unsupported-operation error.
    #[must_use]
    pub fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Whether this error means the object was absent.
    ///
    /// Absence is non-fatal for deletes: the desired state already holds.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<opendal::Error> for BackendError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            opendal::ErrorKind::Unsupported => Self::Unsupported {
                operation: "presign",
            },
            _ => Self::Operation(err.to_string()),
        }
    }
}
