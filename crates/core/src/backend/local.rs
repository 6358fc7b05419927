//! Local filesystem adapter.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use uuid::Uuid;

use super::adapter::BackendAdapter;
use super::error::BackendError;
use crate::attachment::StagedPayload;
use crate::keys::ObjectKey;

/// Filesystem storage rooted at a directory.
///
/// Writes are atomic: bytes land in a temp sibling first and are renamed
/// into place, so readers never observe a partial file. Deletes prune
/// now-empty ancestor directories up to (not including) the root.
#[derive(Debug, Clone)]
pub struct LocalPathAdapter {
    root: PathBuf,
}

impl LocalPathAdapter {
    /// Create an adapter rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &ObjectKey) -> PathBuf {
        self.root.join(&key.path)
    }

    /// Remove empty directories from `dir` upward, stopping at the root
    /// or at the first non-empty directory.
    async fn prune_empty_dirs(&self, dir: &Path) {
        let mut current = dir.to_path_buf();
        while current != self.root && current.starts_with(&self.root) {
            // remove_dir refuses non-empty directories, which ends the walk.
            if fs::remove_dir(&current).await.is_err() {
                break;
            }
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }
    }
}

#[async_trait]
impl BackendAdapter for LocalPathAdapter {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn store(&self, key: &ObjectKey, payload: &StagedPayload) -> Result<(), BackendError> {
        let target = self.resolve(key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = target.with_file_name(format!("{}.{}.tmp", key.filename, Uuid::new_v4()));
        fs::write(&tmp, payload.bytes()).await?;
        if let Err(err) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn fetch(&self, key: &ObjectKey) -> Result<Bytes, BackendError> {
        match fs::read(self.resolve(key)).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(BackendError::not_found(&key.path))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), BackendError> {
        let target = self.resolve(key);
        match fs::remove_file(&target).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(BackendError::not_found(&key.path));
            }
            Err(err) => return Err(err.into()),
        }
        if let Some(parent) = target.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, BackendError> {
        match fs::metadata(self.resolve(key)).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn rename(&self, old: &ObjectKey, new: &ObjectKey) -> Result<(), BackendError> {
        let source = self.resolve(old);
        let target = self.resolve(new);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        match fs::rename(&source, &target).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(BackendError::not_found(&old.path));
            }
            Err(err) => return Err(err.into()),
        }
        if let Some(parent) = source.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }

    fn location(&self, key: &ObjectKey) -> String {
        self.resolve(key).display().to_string()
    }

    fn public_url(&self, key: &ObjectKey) -> Result<String, BackendError> {
        // Site-relative URL assuming the root is served as the document root.
        Ok(format!("/{}", key.path))
    }
}
