//! Attachment and thumbnail record types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::{sanitize_filename, thumbnail_filename};

/// A logical attached file mirrored across a set of storage backends.
///
/// The record owns its persisted active-backend set; adapters hold no
/// attachment state. The host persists this value alongside its own
/// record and hands it back to the engine on every save/destroy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Stable identity.
    pub id: Uuid,
    /// Owning collection namespace.
    pub collection: String,
    /// Logical filename (sanitized before any key derivation).
    pub filename: String,
    /// Shadow of the filename prior to a rename; retained until every
    /// backend has been moved so a failed rename can be resumed.
    pub previous_filename: Option<String>,
    /// Payload size in bytes.
    pub byte_size: u64,
    /// MIME type of the payload.
    pub content_type: String,
    /// SHA-256 checksum of the payload, hex-encoded.
    pub checksum_sha256: Option<String>,
    /// The persisted active-backend set: names of backends currently (or
    /// about to be) holding this record's bytes.
    pub backends: Vec<String>,
    /// Derived artifacts whose lifecycle follows this record.
    pub thumbnails: Vec<Thumbnail>,
}

impl Attachment {
    /// Create a new, not-yet-stored attachment.
    #[must_use]
    pub fn new(
        collection: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            collection: collection.into(),
            filename: sanitize_filename(&filename.into()),
            previous_filename: None,
            byte_size: 0,
            content_type: content_type.into(),
            checksum_sha256: None,
            backends: Vec::new(),
            thumbnails: Vec::new(),
        }
    }

    /// Whether the record has been stored at least once.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        !self.backends.is_empty()
    }

    /// Whether a rename is pending (the shadow filename is set).
    #[must_use]
    pub fn rename_pending(&self) -> bool {
        self.previous_filename.is_some()
    }

    /// Request a rename to `filename`.
    ///
    /// Records the current name as the shadow value so backend keys can be
    /// moved on the next save. If a rename is already pending, the
    /// original shadow is kept — backend data still lives under it.
    pub fn rename_to(&mut self, filename: impl Into<String>) {
        let new_name = sanitize_filename(&filename.into());
        if new_name == self.filename {
            return;
        }
        let old_name = std::mem::replace(&mut self.filename, new_name);
        if self.is_persisted() {
            self.previous_filename.get_or_insert(old_name);
        }
    }

    /// Find a thumbnail by suffix.
    #[must_use]
    pub fn thumbnail(&self, suffix: &str) -> Option<&Thumbnail> {
        self.thumbnails.iter().find(|t| t.suffix == suffix)
    }
}

/// A derived artifact (thumbnail) lifecycle-bound to a parent attachment.
///
/// Its filename is the parent's with the suffix inserted before the
/// extension; its backend set is inherited from the parent at each save
/// unless an explicit override is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbnail {
    /// Own stable identity (distinct from the parent's).
    pub id: Uuid,
    /// Parent attachment identity.
    pub parent_id: Uuid,
    /// Transformation label, e.g. `"thumb"` or `"64x64"`.
    pub suffix: String,
    /// The persisted active-backend set for this artifact.
    pub backends: Vec<String>,
    /// Explicit backend selection overriding the parent's set.
    pub backend_override: Option<Vec<String>>,
}

impl Thumbnail {
    /// Create a thumbnail record for `parent` with the given suffix.
    #[must_use]
    pub fn new(parent: &Attachment, suffix: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: parent.id,
            suffix: suffix.into(),
            backends: Vec::new(),
            backend_override: None,
        }
    }

    /// The artifact's filename derived from the parent's.
    #[must_use]
    pub fn filename(&self, parent_filename: &str) -> String {
        thumbnail_filename(parent_filename, &self.suffix)
    }
}
