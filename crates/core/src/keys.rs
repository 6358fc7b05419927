//! Storage key derivation.
//!
//! Every backend addresses an attachment through the same canonical key:
//! `{prefix_or_collection}/{record_id}/{filename}`, with thumbnail
//! suffixes inserted before the file extension. Derivation is
//! deterministic and side-effect-free; a key changes only when the
//! filename or identity changes.

use uuid::Uuid;

/// Canonical storage location of one attachment (or thumbnail) datum.
///
/// Adapters pick the component they address by: path-shaped backends use
/// [`ObjectKey::path`], the blob-column backend keys rows by
/// [`ObjectKey::record_id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// Owning collection namespace.
    pub collection: String,
    /// Identity of the record (the thumbnail's own identity for derived
    /// artifacts).
    pub record_id: Uuid,
    /// Sanitized filename with any thumbnail suffix applied.
    pub filename: String,
    /// Joined canonical path: `prefix/{record_id}/{filename}`.
    pub path: String,
}

impl ObjectKey {
    /// Derive the canonical key for an attachment datum.
    ///
    /// `prefix` overrides the leading segment (defaults to the collection
    /// name); `thumb_suffix` is inserted before the filename extension.
    #[must_use]
    pub fn derive(
        collection: &str,
        prefix: Option<&str>,
        record_id: Uuid,
        filename: &str,
        thumb_suffix: Option<&str>,
    ) -> Self {
        let base = prefix.unwrap_or(collection);
        let mut name = sanitize_filename(filename);
        if let Some(suffix) = thumb_suffix {
            name = thumbnail_filename(&name, suffix);
        }
        let path = format!("{base}/{record_id}/{name}");
        Self {
            collection: collection.to_string(),
            record_id,
            filename: name,
            path,
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

/// Sanitize a filename for use in storage keys.
///
/// Only ASCII alphanumeric characters, dots, hyphens, and underscores
/// survive; everything else (path separators included) becomes `_`.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Insert a thumbnail suffix before the filename extension.
///
/// `photo.jpg` + `thumb` → `photo_thumb.jpg`; a filename without an
/// extension gets the suffix appended.
#[must_use]
pub fn thumbnail_filename(filename: &str, suffix: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{filename}_{suffix}"),
    }
}
