//! The blob-column backend adapter.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tracing::debug;

use stowage_core::attachment::StagedPayload;
use stowage_core::backend::{BackendAdapter, BackendError};
use stowage_core::keys::ObjectKey;

use crate::entities::attachment_blobs::{ActiveModel, Entity, Model};

/// Relational blob-column storage.
///
/// Rows are keyed by the record identity, so a logical rename only
/// updates the filename metadata; no data moves. Deletes are soft: the
/// `destroyed` flag is flipped rather than erasing the row, and
/// destroyed rows read as absent everywhere else.
#[derive(Debug)]
pub struct BlobColumnAdapter {
    db: DatabaseConnection,
}

impl BlobColumnAdapter {
    /// Create an adapter over an established connection.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find(&self, key: &ObjectKey) -> Result<Option<Model>, BackendError> {
        Entity::find_by_id(key.record_id)
            .one(&self.db)
            .await
            .map_err(|e| BackendError::operation(e.to_string()))
    }
}

#[async_trait]
impl BackendAdapter for BlobColumnAdapter {
    fn kind(&self) -> &'static str {
        "blob"
    }

    async fn store(&self, key: &ObjectKey, payload: &StagedPayload) -> Result<(), BackendError> {
        let now = Utc::now();
        let byte_size = i64::try_from(payload.byte_size()).unwrap_or(i64::MAX);

        match self.find(key).await? {
            Some(model) => {
                // Overwrite in place; a soft-deleted row is revived.
                let mut active: ActiveModel = model.into();
                active.filename = Set(key.filename.clone());
                active.content_type = Set(payload.content_type().to_string());
                active.byte_size = Set(byte_size);
                active.checksum_sha256 = Set(Some(payload.checksum_sha256().to_string()));
                active.data = Set(payload.bytes().to_vec());
                active.destroyed = Set(false);
                active.updated_at = Set(now.into());
                active
                    .update(&self.db)
                    .await
                    .map_err(|e| BackendError::operation(e.to_string()))?;
            }
            None => {
                let active = ActiveModel {
                    record_id: Set(key.record_id),
                    collection: Set(key.collection.clone()),
                    filename: Set(key.filename.clone()),
                    content_type: Set(payload.content_type().to_string()),
                    byte_size: Set(byte_size),
                    checksum_sha256: Set(Some(payload.checksum_sha256().to_string())),
                    data: Set(payload.bytes().to_vec()),
                    destroyed: Set(false),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                active
                    .insert(&self.db)
                    .await
                    .map_err(|e| BackendError::operation(e.to_string()))?;
            }
        }
        debug!(record_id = %key.record_id, bytes = byte_size, "blob stored");
        Ok(())
    }

    async fn fetch(&self, key: &ObjectKey) -> Result<Bytes, BackendError> {
        match self.find(key).await? {
            Some(model) if !model.destroyed => Ok(Bytes::from(model.data)),
            _ => Err(BackendError::not_found(&key.path)),
        }
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), BackendError> {
        match self.find(key).await? {
            Some(model) if !model.destroyed => {
                let mut active: ActiveModel = model.into();
                active.destroyed = Set(true);
                active.updated_at = Set(Utc::now().into());
                active
                    .update(&self.db)
                    .await
                    .map_err(|e| BackendError::operation(e.to_string()))?;
                debug!(record_id = %key.record_id, "blob soft-deleted");
                Ok(())
            }
            _ => Err(BackendError::not_found(&key.path)),
        }
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, BackendError> {
        Ok(matches!(self.find(key).await?, Some(model) if !model.destroyed))
    }

    async fn rename(&self, old: &ObjectKey, new: &ObjectKey) -> Result<(), BackendError> {
        // Identity-keyed rows never move; only the filename metadata
        // follows the logical rename.
        match self.find(old).await? {
            Some(model) if !model.destroyed => {
                let mut active: ActiveModel = model.into();
                active.filename = Set(new.filename.clone());
                active.updated_at = Set(Utc::now().into());
                active
                    .update(&self.db)
                    .await
                    .map_err(|e| BackendError::operation(e.to_string()))?;
                Ok(())
            }
            _ => Err(BackendError::not_found(&old.path)),
        }
    }

    fn location(&self, key: &ObjectKey) -> String {
        format!("blob://attachment_blobs/{}", key.record_id)
    }

    fn public_url(&self, _key: &ObjectKey) -> Result<String, BackendError> {
        Err(BackendError::unsupported("public_url"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use uuid::Uuid;

    fn key(filename: &str) -> ObjectKey {
        ObjectKey::derive(
            "documents",
            None,
            Uuid::parse_str("6ba7b811-9dad-11d1-80b4-00c04fd430c8").expect("valid uuid"),
            filename,
            None,
        )
    }

    fn model(key: &ObjectKey, destroyed: bool) -> Model {
        let now = Utc::now();
        Model {
            record_id: key.record_id,
            collection: key.collection.clone(),
            filename: key.filename.clone(),
            content_type: "application/pdf".to_string(),
            byte_size: 9,
            checksum_sha256: None,
            data: b"pdf bytes".to_vec(),
            destroyed,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn test_fetch_active_row_returns_bytes() {
        let key = key("invoice.pdf");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(&key, false)]])
            .into_connection();
        let adapter = BlobColumnAdapter::new(db);

        let bytes = adapter.fetch(&key).await.expect("fetch");
        assert_eq!(bytes.as_ref(), b"pdf bytes");
    }

    #[tokio::test]
    async fn test_fetch_destroyed_row_is_not_found() {
        let key = key("invoice.pdf");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(&key, true)]])
            .into_connection();
        let adapter = BlobColumnAdapter::new(db);

        let err = adapter.fetch(&key).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_exists_respects_destroyed_flag() {
        let key = key("invoice.pdf");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![model(&key, false)],
                vec![model(&key, true)],
                Vec::<Model>::new(),
            ])
            .into_connection();
        let adapter = BlobColumnAdapter::new(db);

        assert!(adapter.exists(&key).await.expect("exists"));
        assert!(!adapter.exists(&key).await.expect("exists"));
        assert!(!adapter.exists(&key).await.expect("exists"));
    }

    #[tokio::test]
    async fn test_store_inserts_new_row() {
        let key = key("invoice.pdf");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<Model>::new(), vec![model(&key, false)]])
            .into_connection();
        let adapter = BlobColumnAdapter::new(db);

        let payload = StagedPayload::from_bytes(&b"pdf bytes"[..], "application/pdf");
        adapter.store(&key, &payload).await.expect("store");
    }

    #[tokio::test]
    async fn test_store_revives_destroyed_row() {
        let key = key("invoice.pdf");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(&key, true)], vec![model(&key, false)]])
            .into_connection();
        let adapter = BlobColumnAdapter::new(db);

        let payload = StagedPayload::from_bytes(&b"pdf bytes"[..], "application/pdf");
        adapter.store(&key, &payload).await.expect("store");
    }

    #[tokio::test]
    async fn test_delete_is_soft() {
        let key = key("invoice.pdf");
        let mut destroyed = model(&key, true);
        destroyed.destroyed = true;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(&key, false)], vec![destroyed]])
            .into_connection();
        let adapter = BlobColumnAdapter::new(db);

        adapter.delete(&key).await.expect("delete");
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let key = key("invoice.pdf");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<Model>::new()])
            .into_connection();
        let adapter = BlobColumnAdapter::new(db);

        let err = adapter.delete(&key).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rename_updates_filename_metadata() {
        let old = key("a.png");
        let new = key("b.png");
        let mut renamed = model(&old, false);
        renamed.filename = "b.png".to_string();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model(&old, false)], vec![renamed]])
            .into_connection();
        let adapter = BlobColumnAdapter::new(db);

        adapter.rename(&old, &new).await.expect("rename");
    }

    #[test]
    fn test_location_is_row_locator() {
        let key = key("invoice.pdf");
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let adapter = BlobColumnAdapter::new(db);
        assert_eq!(
            adapter.location(&key),
            format!("blob://attachment_blobs/{}", key.record_id)
        );
        assert!(matches!(
            adapter.public_url(&key).unwrap_err(),
            BackendError::Unsupported { .. }
        ));
    }
}
