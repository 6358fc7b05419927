//! The uniform backend adapter surface.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::error::BackendError;
use crate::attachment::StagedPayload;
use crate::keys::ObjectKey;

/// Default signed-URL lifetime: 5 minutes.
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(300);

/// A time-bounded signed URL for direct reads.
#[derive(Debug, Clone)]
pub struct SignedUrl {
    /// The signed URL.
    pub url: String,
    /// HTTP method to use.
    pub method: String,
    /// When the URL expires.
    pub expires_at: DateTime<Utc>,
}

/// Expiry for a signed URL: an absolute timestamp or seconds from now.
#[derive(Debug, Clone, Copy)]
pub enum UrlExpiry {
    /// Expire at an absolute instant.
    At(DateTime<Utc>),
    /// Expire after a relative duration.
    In(Duration),
}

impl Default for UrlExpiry {
    fn default() -> Self {
        Self::In(DEFAULT_SIGNED_URL_TTL)
    }
}

impl UrlExpiry {
    /// Expiry after the given number of seconds.
    #[must_use]
    pub fn seconds(secs: u64) -> Self {
        Self::In(Duration::from_secs(secs))
    }

    /// The remaining lifetime, measured from `now`.
    ///
    /// An absolute expiry already in the past yields a zero lifetime.
    #[must_use]
    pub fn ttl_from(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Self::In(ttl) => *ttl,
            Self::At(at) => (*at - now).to_std().unwrap_or(Duration::ZERO),
        }
    }

    /// The absolute expiry instant, measured from `now`.
    #[must_use]
    pub fn expires_at_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::At(at) => *at,
            Self::In(ttl) => chrono::Duration::from_std(*ttl)
                .ok()
                .and_then(|d| now.checked_add_signed(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

/// Uniform capability surface over one storage medium.
///
/// Adapters are stateless with respect to attachments: each call is a
/// function of (key, bytes) → effect, parameterized only by the adapter's
/// configuration. Absence (`NotFound`) is fatal on `fetch` and treated as
/// already-satisfied by the engine on `delete`.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Adapter kind token used in logs and error messages.
    fn kind(&self) -> &'static str;

    /// Write the payload under `key`, overwriting any previous object.
    async fn store(&self, key: &ObjectKey, payload: &StagedPayload) -> Result<(), BackendError>;

    /// Read the object bytes under `key`.
    async fn fetch(&self, key: &ObjectKey) -> Result<Bytes, BackendError>;

    /// Remove the object under `key`.
    async fn delete(&self, key: &ObjectKey) -> Result<(), BackendError>;

    /// Whether an object exists under `key`.
    async fn exists(&self, key: &ObjectKey) -> Result<bool, BackendError>;

    /// Move the object from `old` to `new`.
    ///
    /// Backends without a native move implement this as copy-then-delete.
    async fn rename(&self, old: &ObjectKey, new: &ObjectKey) -> Result<(), BackendError>;

    /// The backend-specific full location of `key` (filesystem path,
    /// bucket-qualified object name, row locator).
    fn location(&self, key: &ObjectKey) -> String;

    /// A publicly addressable URL for `key`, where the backend and its
    /// access flag allow one.
    fn public_url(&self, key: &ObjectKey) -> Result<String, BackendError>;

    /// A time-bounded signed URL for `key`.
    async fn signed_url(
        &self,
        key: &ObjectKey,
        expiry: UrlExpiry,
    ) -> Result<SignedUrl, BackendError> {
        let _ = (key, expiry);
        Err(BackendError::unsupported("signed_url"))
    }
}
