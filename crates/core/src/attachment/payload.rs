//! Staged byte payloads.

use bytes::Bytes;
use sha2::{Digest, Sha256};

/// A byte payload staged exactly once per save cycle.
///
/// Every backend consuming the payload in the same cycle shares this
/// buffer, so all of them see identical bytes without re-reading the
/// source.
#[derive(Debug, Clone)]
pub struct StagedPayload {
    bytes: Bytes,
    content_type: String,
    checksum_sha256: String,
}

impl StagedPayload {
    /// Stage an in-memory payload; computes the SHA-256 checksum up front.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        let bytes = bytes.into();
        let checksum_sha256 = hex::encode(Sha256::digest(&bytes));
        Self {
            bytes,
            content_type: content_type.into(),
            checksum_sha256,
        }
    }

    /// Stage a payload by reading a file once.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn from_path(
        path: impl AsRef<std::path::Path>,
        content_type: impl Into<String>,
    ) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(bytes, content_type))
    }

    /// The shared byte buffer (cheap to clone).
    #[must_use]
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// MIME type of the payload.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Hex-encoded SHA-256 checksum of the payload.
    #[must_use]
    pub fn checksum_sha256(&self) -> &str {
        &self.checksum_sha256
    }
}
