//! The `AttachmentStore` facade.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use stowage_shared::StorageSettings;

use crate::attachment::Attachment;
use crate::backend::{BackendAdapter, BackendRegistry, SignedUrl, UrlExpiry};
use crate::keys::ObjectKey;
use crate::lifecycle::{DestroyOutcome, PreparedSave, SaveOutcome, SaveRequest};
use crate::reconcile::{Engine, StoreError};

struct CollectionRuntime {
    registry: BackendRegistry,
    defaults: Vec<String>,
    path_prefix: Option<String>,
}

impl CollectionRuntime {
    fn engine(&self) -> Engine<'_> {
        Engine::new(&self.registry, &self.defaults, self.path_prefix.as_deref())
    }
}

/// Builder wiring declarative settings and host-constructed adapters into
/// an [`AttachmentStore`].
pub struct AttachmentStoreBuilder {
    settings: StorageSettings,
    host_adapters: HashMap<String, HashMap<String, Arc<dyn BackendAdapter>>>,
}

impl AttachmentStoreBuilder {
    /// Register a host-constructed adapter for a collection's backend
    /// name (the blob-column adapter needs a live database connection and
    /// cannot be built from declarative settings alone).
    #[must_use]
    pub fn adapter(
        mut self,
        collection: impl Into<String>,
        name: impl Into<String>,
        adapter: Arc<dyn BackendAdapter>,
    ) -> Self {
        self.host_adapters
            .entry(collection.into())
            .or_default()
            .insert(name.into(), adapter);
        self
    }

    /// Resolve every collection's dispatch table and build the store.
    ///
    /// # Errors
    ///
    /// Returns an error if settings fail validation, a remote operator
    /// cannot be initialized, or a blob declaration has no registered
    /// adapter.
    pub fn build(mut self) -> Result<AttachmentStore, StoreError> {
        self.settings.validate()?;

        let mut collections = HashMap::new();
        for (name, settings) in &self.settings.collections {
            let host = self.host_adapters.remove(name).unwrap_or_default();
            let registry = BackendRegistry::from_settings(settings, host)?;
            collections.insert(
                name.clone(),
                CollectionRuntime {
                    registry,
                    defaults: settings.defaults.clone(),
                    path_prefix: settings.path_prefix.clone(),
                },
            );
        }
        Ok(AttachmentStore { collections })
    }
}

/// Facade over all configured collections: lifecycle stages consumed by
/// the host's save/destroy hooks plus the public query surface.
///
/// Built once at configuration load; shared read-only across requests.
pub struct AttachmentStore {
    collections: HashMap<String, CollectionRuntime>,
}

impl AttachmentStore {
    /// Start building a store from declarative settings.
    #[must_use]
    pub fn builder(settings: StorageSettings) -> AttachmentStoreBuilder {
        AttachmentStoreBuilder {
            settings,
            host_adapters: HashMap::new(),
        }
    }

    fn runtime(&self, collection: &str) -> Result<&CollectionRuntime, StoreError> {
        self.collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))
    }

    fn object_key(
        &self,
        runtime: &CollectionRuntime,
        record: &Attachment,
        thumbnail: Option<&str>,
    ) -> Result<ObjectKey, StoreError> {
        let prefix = runtime.path_prefix.as_deref();
        match thumbnail {
            None => Ok(ObjectKey::derive(
                &record.collection,
                prefix,
                record.id,
                &record.filename,
                None,
            )),
            Some(suffix) => {
                let thumb = record
                    .thumbnail(suffix)
                    .ok_or_else(|| StoreError::UnknownThumbnail {
                        suffix: suffix.to_string(),
                    })?;
                Ok(ObjectKey::derive(
                    &record.collection,
                    prefix,
                    thumb.id,
                    &record.filename,
                    Some(suffix),
                ))
            }
        }
    }

    fn adapter<'rt>(
        &self,
        runtime: &'rt CollectionRuntime,
        record: &Attachment,
        backend: &str,
    ) -> Result<&'rt Arc<dyn BackendAdapter>, StoreError> {
        runtime
            .registry
            .get(backend)
            .ok_or_else(|| StoreError::unknown_backend(backend, &record.collection))
    }

    /// Before-save stage: resolve selection, stage payloads, compute the
    /// plan. All policy errors surface here, before any write.
    ///
    /// # Errors
    ///
    /// See [`Engine::prepare_save`].
    pub async fn prepare_save(
        &self,
        record: &Attachment,
        request: SaveRequest,
    ) -> Result<PreparedSave, StoreError> {
        self.runtime(&record.collection)?
            .engine()
            .prepare_save(record, request)
            .await
    }

    /// After-commit stage: execute the prepared plan and commit the new
    /// active set onto the record.
    ///
    /// # Errors
    ///
    /// See [`Engine::complete_save`].
    pub async fn complete_save(
        &self,
        record: &mut Attachment,
        prepared: PreparedSave,
    ) -> Result<SaveOutcome, StoreError> {
        self.runtime(&record.collection)?
            .engine()
            .complete_save(record, prepared)
            .await
    }

    /// Run a full save cycle (prepare + complete) in one call.
    ///
    /// # Errors
    ///
    /// Returns any preparation or execution error; on execution failure
    /// the record keeps its last committed set.
    pub async fn save(
        &self,
        record: &mut Attachment,
        request: SaveRequest,
    ) -> Result<SaveOutcome, StoreError> {
        let prepared = self.prepare_save(record, request).await?;
        self.complete_save(record, prepared).await
    }

    /// After-destroy stage: remove the record's (and its artifacts')
    /// bytes from every backend they live on.
    ///
    /// # Errors
    ///
    /// See [`Engine::destroy`].
    pub async fn destroy(&self, record: &mut Attachment) -> Result<DestroyOutcome, StoreError> {
        self.runtime(&record.collection)?
            .engine()
            .destroy(record)
            .await
    }

    /// The record's committed active-backend set.
    #[must_use]
    pub fn active_backend_names<'r>(&self, record: &'r Attachment) -> &'r [String] {
        &record.backends
    }

    /// The backend-specific full location of the record's bytes (or a
    /// thumbnail's, when `thumbnail` names a suffix).
    ///
    /// # Errors
    ///
    /// Returns an error for unknown collections, backends, or suffixes.
    pub fn full_location(
        &self,
        record: &Attachment,
        backend: &str,
        thumbnail: Option<&str>,
    ) -> Result<String, StoreError> {
        let runtime = self.runtime(&record.collection)?;
        let adapter = self.adapter(runtime, record, backend)?;
        let key = self.object_key(runtime, record, thumbnail)?;
        Ok(adapter.location(&key))
    }

    /// A publicly addressable URL for the record's bytes, where the
    /// backend and its access flag allow one.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend does not serve public URLs.
    pub fn public_url(
        &self,
        record: &Attachment,
        backend: &str,
        thumbnail: Option<&str>,
    ) -> Result<String, StoreError> {
        let runtime = self.runtime(&record.collection)?;
        let adapter = self.adapter(runtime, record, backend)?;
        let key = self.object_key(runtime, record, thumbnail)?;
        adapter
            .public_url(&key)
            .map_err(|e| StoreError::adapter(backend, "url", e))
    }

    /// A time-bounded signed URL for the record's bytes. The expiry may
    /// be absolute or relative; the default is 5 minutes.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot presign.
    pub async fn signed_url(
        &self,
        record: &Attachment,
        backend: &str,
        thumbnail: Option<&str>,
        expiry: UrlExpiry,
    ) -> Result<SignedUrl, StoreError> {
        let runtime = self.runtime(&record.collection)?;
        let adapter = self.adapter(runtime, record, backend)?;
        let key = self.object_key(runtime, record, thumbnail)?;
        adapter
            .signed_url(&key, expiry)
            .await
            .map_err(|e| StoreError::adapter(backend, "url", e))
    }

    /// Whether the record's bytes exist on the named backend.
    ///
    /// # Errors
    ///
    /// Returns adapter failures; absence itself is `Ok(false)`.
    pub async fn exists(
        &self,
        record: &Attachment,
        backend: &str,
        thumbnail: Option<&str>,
    ) -> Result<bool, StoreError> {
        let runtime = self.runtime(&record.collection)?;
        let adapter = self.adapter(runtime, record, backend)?;
        let key = self.object_key(runtime, record, thumbnail)?;
        adapter
            .exists(&key)
            .await
            .map_err(|e| StoreError::adapter(backend, "exists", e))
    }

    /// Read the record's bytes from the named backend.
    ///
    /// # Errors
    ///
    /// Absence is fatal here: a missing object is an adapter error, never
    /// a silent empty result.
    pub async fn fetch(
        &self,
        record: &Attachment,
        backend: &str,
        thumbnail: Option<&str>,
    ) -> Result<Bytes, StoreError> {
        let runtime = self.runtime(&record.collection)?;
        let adapter = self.adapter(runtime, record, backend)?;
        let key = self.object_key(runtime, record, thumbnail)?;
        adapter
            .fetch(&key)
            .await
            .map_err(|e| StoreError::adapter(backend, "fetch", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::StagedPayload;
    use crate::backend::{BackendError, MemoryAdapter};
    use crate::lifecycle::ThumbnailSpec;
    use std::sync::atomic::{AtomicBool, Ordering};
    use stowage_shared::{BackendSettings, CollectionSettings};

    /// Adapter wrapper that fails selected operations on demand.
    struct FailingAdapter {
        inner: Arc<MemoryAdapter>,
        fail_store: AtomicBool,
        fail_rename: AtomicBool,
    }

    impl FailingAdapter {
        fn new(inner: Arc<MemoryAdapter>) -> Self {
            Self {
                inner,
                fail_store: AtomicBool::new(false),
                fail_rename: AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl BackendAdapter for FailingAdapter {
        fn kind(&self) -> &'static str {
            "failing"
        }

        async fn store(
            &self,
            key: &ObjectKey,
            payload: &StagedPayload,
        ) -> Result<(), BackendError> {
            if self.fail_store.load(Ordering::SeqCst) {
                return Err(BackendError::operation("injected store failure"));
            }
            self.inner.store(key, payload).await
        }

        async fn fetch(&self, key: &ObjectKey) -> Result<Bytes, BackendError> {
            self.inner.fetch(key).await
        }

        async fn delete(&self, key: &ObjectKey) -> Result<(), BackendError> {
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &ObjectKey) -> Result<bool, BackendError> {
            self.inner.exists(key).await
        }

        async fn rename(&self, old: &ObjectKey, new: &ObjectKey) -> Result<(), BackendError> {
            if self.fail_rename.load(Ordering::SeqCst) {
                return Err(BackendError::operation("injected rename failure"));
            }
            self.inner.rename(old, new).await
        }

        fn location(&self, key: &ObjectKey) -> String {
            self.inner.location(key)
        }

        fn public_url(&self, key: &ObjectKey) -> Result<String, BackendError> {
            self.inner.public_url(key)
        }
    }

    fn settings_with(names: &[&str], defaults: &[&str]) -> StorageSettings {
        let mut collection = CollectionSettings::new();
        for name in names {
            collection = collection.with_backend(*name, BackendSettings::Memory);
        }
        StorageSettings::new()
            .with_collection("documents", collection.with_defaults(defaults.to_vec()))
    }

    /// Store with two inspectable memory backends, both default.
    fn two_backend_store() -> (AttachmentStore, Arc<MemoryAdapter>, Arc<MemoryAdapter>) {
        let local = Arc::new(MemoryAdapter::new());
        let blob = Arc::new(MemoryAdapter::new());
        let store = AttachmentStore::builder(settings_with(&["local", "blob"], &["local", "blob"]))
            .adapter("documents", "local", local.clone())
            .adapter("documents", "blob", blob.clone())
            .build()
            .expect("store");
        (store, local, blob)
    }

    fn image_payload() -> StagedPayload {
        StagedPayload::from_bytes(&b"\x89PNG fixture bytes"[..], "image/png")
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    // Scenario: create with defaults {local, blob} → both backends hold
    // the key and the active set records both.
    #[tokio::test]
    async fn test_create_mirrors_to_all_default_backends() {
        let (store, local, blob) = two_backend_store();
        let mut record = Attachment::new("documents", "photo.png", "image/png");

        let outcome = store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .expect("save");

        assert_eq!(outcome.active_backends, names(&["local", "blob"]));
        assert_eq!(store.active_backend_names(&record), names(&["local", "blob"]));
        assert!(store.exists(&record, "local", None).await.expect("exists"));
        assert!(store.exists(&record, "blob", None).await.expect("exists"));
        assert_eq!(local.object_count(), 1);
        assert_eq!(blob.object_count(), 1);
        assert_eq!(record.byte_size, 18);
        assert!(record.checksum_sha256.is_some());
    }

    // Scenario: shrink the set with an override → dropped backend's key
    // is cleaned up, kept backend's data survives.
    #[tokio::test]
    async fn test_override_shrinks_set_and_cleans_orphans() {
        let (store, local, blob) = two_backend_store();
        let mut record = Attachment::new("documents", "photo.png", "image/png");
        store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .expect("save");

        let outcome = store
            .save(&mut record, SaveRequest::new().with_backends(["blob"]))
            .await
            .expect("save");

        assert_eq!(outcome.removed, names(&["local"]));
        assert_eq!(store.active_backend_names(&record), names(&["blob"]));
        assert!(!store.exists(&record, "local", None).await.expect("exists"));
        assert!(store.exists(&record, "blob", None).await.expect("exists"));
        assert_eq!(local.object_count(), 0);
        assert_eq!(blob.object_count(), 1);
    }

    // Growing the set back stages bytes from a surviving backend; no
    // fresh upload is needed.
    #[tokio::test]
    async fn test_adding_backend_stages_from_previous_backend() {
        let (store, local, _blob) = two_backend_store();
        let mut record = Attachment::new("documents", "photo.png", "image/png");
        store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .expect("save");
        store
            .save(&mut record, SaveRequest::new().with_backends(["blob"]))
            .await
            .expect("save");
        assert_eq!(local.object_count(), 0);

        store
            .save(&mut record, SaveRequest::new().with_backends(["blob", "local"]))
            .await
            .expect("save");

        assert!(store.exists(&record, "local", None).await.expect("exists"));
        let bytes = store.fetch(&record, "local", None).await.expect("fetch");
        assert_eq!(bytes.as_ref(), b"\x89PNG fixture bytes");
    }

    // Idempotent resolution: an unchanged save leaves the set untouched
    // and issues no writes.
    #[tokio::test]
    async fn test_repeated_save_is_idempotent() {
        let (store, local, blob) = two_backend_store();
        let mut record = Attachment::new("documents", "photo.png", "image/png");
        store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .expect("save");

        let before = store.active_backend_names(&record).to_vec();
        let local_ops = local.operations().len();
        let blob_ops = blob.operations().len();

        store
            .save(&mut record, SaveRequest::new())
            .await
            .expect("save");

        assert_eq!(store.active_backend_names(&record), before);
        assert_eq!(local.operations().len(), local_ops);
        assert_eq!(blob.operations().len(), blob_ops);
    }

    // Re-uploading identical bytes also skips the update writes.
    #[tokio::test]
    async fn test_identical_payload_skips_update_writes() {
        let (store, local, _blob) = two_backend_store();
        let mut record = Attachment::new("documents", "photo.png", "image/png");
        store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .expect("save");
        let store_calls = |a: &MemoryAdapter| {
            a.operations().iter().filter(|o| o.op == "store").count()
        };
        let before = store_calls(&local);

        let outcome = store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .expect("save");

        assert!(outcome.updated.is_empty());
        assert_eq!(store_calls(&local), before);
    }

    // Set convergence: active names exist, configured-but-inactive names
    // do not.
    #[tokio::test]
    async fn test_set_convergence_across_configured_backends() {
        let extra = Arc::new(MemoryAdapter::new());
        let local = Arc::new(MemoryAdapter::new());
        let store = AttachmentStore::builder(settings_with(
            &["local", "blob", "archive"],
            &["local", "blob"],
        ))
        .adapter("documents", "local", local)
        .adapter("documents", "archive", extra)
        .build()
        .expect("store");

        let mut record = Attachment::new("documents", "photo.png", "image/png");
        store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .expect("save");

        for name in store.active_backend_names(&record).to_vec() {
            assert!(store.exists(&record, &name, None).await.expect("exists"));
        }
        assert!(!store.exists(&record, "archive", None).await.expect("exists"));
    }

    // Destroy completeness: every backend in the pre-destroy set loses
    // the key, thumbnails included.
    #[tokio::test]
    async fn test_destroy_removes_all_copies_and_thumbnails() {
        let (store, local, blob) = two_backend_store();
        let mut record = Attachment::new("documents", "photo.png", "image/png");
        store
            .save(
                &mut record,
                SaveRequest::new()
                    .with_payload(image_payload())
                    .with_thumbnail(ThumbnailSpec::new(
                        "thumb",
                        StagedPayload::from_bytes(&b"small"[..], "image/png"),
                    )),
            )
            .await
            .expect("save");
        assert_eq!(local.object_count(), 2);
        assert_eq!(blob.object_count(), 2);

        let outcome = store.destroy(&mut record).await.expect("destroy");

        assert_eq!(outcome.removed, names(&["local", "blob"]));
        assert_eq!(outcome.thumbnails_removed, 1);
        assert_eq!(local.object_count(), 0);
        assert_eq!(blob.object_count(), 0);
        assert!(record.backends.is_empty());
        assert!(record.thumbnails.is_empty());
    }

    // Destroying an already-clean record treats absence as success.
    #[tokio::test]
    async fn test_destroy_tolerates_missing_objects() {
        let (store, local, _blob) = two_backend_store();
        let mut record = Attachment::new("documents", "photo.png", "image/png");
        store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .expect("save");

        // Simulate an external cleanup on one backend.
        let key = ObjectKey::derive("documents", None, record.id, "photo.png", None);
        local.delete(&key).await.expect("delete");

        store.destroy(&mut record).await.expect("destroy");
        assert!(record.backends.is_empty());
    }

    // Rename: both backends end with the new key and without the old.
    #[tokio::test]
    async fn test_rename_moves_every_backend() {
        let (store, local, blob) = two_backend_store();
        let mut record = Attachment::new("documents", "a.png", "image/png");
        store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .expect("save");
        let old_path = ObjectKey::derive("documents", None, record.id, "a.png", None).path;

        record.rename_to("b.png");
        let outcome = store
            .save(&mut record, SaveRequest::new())
            .await
            .expect("save");

        assert!(outcome.renamed);
        assert!(record.previous_filename.is_none());
        let new_path = ObjectKey::derive("documents", None, record.id, "b.png", None).path;
        for adapter in [&local, &blob] {
            assert!(!adapter.contains(&old_path));
            assert!(adapter.contains(&new_path));
        }
    }

    // Partial rename failure keeps the shadow filename; a retry finishes
    // the remaining moves without re-moving completed backends.
    #[tokio::test]
    async fn test_partial_rename_failure_resumes_on_retry() {
        let fs1 = Arc::new(MemoryAdapter::new());
        let fs2_inner = Arc::new(MemoryAdapter::new());
        let fs2 = Arc::new(FailingAdapter::new(fs2_inner.clone()));
        let store = AttachmentStore::builder(settings_with(&["fs1", "fs2"], &["fs1", "fs2"]))
            .adapter("documents", "fs1", fs1.clone())
            .adapter("documents", "fs2", fs2.clone())
            .build()
            .expect("store");

        let mut record = Attachment::new("documents", "a.png", "image/png");
        store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .expect("save");

        fs2.fail_rename.store(true, Ordering::SeqCst);
        record.rename_to("b.png");
        let err = store.save(&mut record, SaveRequest::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Rename { .. }));
        // Shadow retained for retry; fs1's completed move not rolled back.
        assert_eq!(record.previous_filename.as_deref(), Some("a.png"));
        let new_path = ObjectKey::derive("documents", None, record.id, "b.png", None).path;
        assert!(fs1.contains(&new_path));

        fs2.fail_rename.store(false, Ordering::SeqCst);
        store
            .save(&mut record, SaveRequest::new())
            .await
            .expect("retry save");

        assert!(record.previous_filename.is_none());
        let old_path = ObjectKey::derive("documents", None, record.id, "a.png", None).path;
        assert!(!fs1.contains(&old_path));
        assert!(!fs2_inner.contains(&old_path));
        assert!(fs1.contains(&new_path));
        assert!(fs2_inner.contains(&new_path));
        // fs1 moved exactly once across both cycles.
        let fs1_renames = fs1.operations().iter().filter(|o| o.op == "rename").count();
        assert_eq!(fs1_renames, 1);
    }

    // No default and no override fails before any adapter call.
    #[tokio::test]
    async fn test_no_default_fails_before_any_adapter_call() {
        let spy = Arc::new(MemoryAdapter::new());
        let store = AttachmentStore::builder(settings_with(&["spy"], &[]))
            .adapter("documents", "spy", spy.clone())
            .build()
            .expect("store");

        let mut record = Attachment::new("documents", "photo.png", "image/png");
        let err = store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NoResolvableBackends { .. }));
        assert!(spy.operations().is_empty());
        assert!(record.backends.is_empty());
    }

    // A fatal store failure aborts before commit: the persisted set keeps
    // its last known-good value even though earlier writes happened.
    #[tokio::test]
    async fn test_store_failure_leaves_committed_set_untouched() {
        let good = Arc::new(MemoryAdapter::new());
        let bad_inner = Arc::new(MemoryAdapter::new());
        let bad = Arc::new(FailingAdapter::new(bad_inner));
        let store = AttachmentStore::builder(settings_with(&["good", "bad"], &["good", "bad"]))
            .adapter("documents", "good", good.clone())
            .adapter("documents", "bad", bad.clone())
            .build()
            .expect("store");

        bad.fail_store.store(true, Ordering::SeqCst);
        let mut record = Attachment::new("documents", "photo.png", "image/png");
        let err = store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Adapter { phase: "store", .. }));
        // No commit: the record still claims no backend, even though the
        // first adapter's write happened (writes are not rolled back).
        assert!(record.backends.is_empty());
        assert_eq!(good.object_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_override_name_rejected() {
        let (store, _local, _blob) = two_backend_store();
        let mut record = Attachment::new("documents", "photo.png", "image/png");

        let err = store
            .save(
                &mut record,
                SaveRequest::new()
                    .with_payload(image_payload())
                    .with_backends(["local", "tape"]),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::UnknownBackend { ref name, .. } if name == "tape"
        ));
    }

    #[tokio::test]
    async fn test_new_record_without_payload_fails() {
        let (store, _local, _blob) = two_backend_store();
        let mut record = Attachment::new("documents", "photo.png", "image/png");

        let err = store.save(&mut record, SaveRequest::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingPayload { .. }));
    }

    #[tokio::test]
    async fn test_unknown_collection_rejected() {
        let (store, _local, _blob) = two_backend_store();
        let mut record = Attachment::new("misc", "photo.png", "image/png");

        let err = store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownCollection(_)));
    }

    // Thumbnails inherit the parent's resolved set and follow renames.
    #[tokio::test]
    async fn test_thumbnail_inherits_set_and_follows_rename() {
        let (store, local, blob) = two_backend_store();
        let mut record = Attachment::new("documents", "photo.png", "image/png");
        store
            .save(
                &mut record,
                SaveRequest::new()
                    .with_payload(image_payload())
                    .with_thumbnail(ThumbnailSpec::new(
                        "thumb",
                        StagedPayload::from_bytes(&b"small"[..], "image/png"),
                    )),
            )
            .await
            .expect("save");

        let thumb = record.thumbnail("thumb").expect("thumbnail").clone();
        assert_eq!(thumb.backends, names(&["local", "blob"]));
        assert!(store
            .exists(&record, "local", Some("thumb"))
            .await
            .expect("exists"));

        record.rename_to("picture.png");
        store
            .save(&mut record, SaveRequest::new())
            .await
            .expect("save");

        let old_thumb_path =
            ObjectKey::derive("documents", None, thumb.id, "photo.png", Some("thumb")).path;
        let new_thumb_path =
            ObjectKey::derive("documents", None, thumb.id, "picture.png", Some("thumb")).path;
        for adapter in [&local, &blob] {
            assert!(!adapter.contains(&old_thumb_path));
            assert!(adapter.contains(&new_thumb_path));
        }
    }

    // An artifact override scopes the artifact to its own set; dropping a
    // parent backend still cleans the artifact copy stored there.
    #[tokio::test]
    async fn test_thumbnail_override_scopes_artifact_set() {
        let (store, local, blob) = two_backend_store();
        let mut record = Attachment::new("documents", "photo.png", "image/png");
        store
            .save(
                &mut record,
                SaveRequest::new()
                    .with_payload(image_payload())
                    .with_thumbnail(
                        ThumbnailSpec::new(
                            "thumb",
                            StagedPayload::from_bytes(&b"small"[..], "image/png"),
                        )
                        .with_backends(["local"]),
                    ),
            )
            .await
            .expect("save");

        let thumb = record.thumbnail("thumb").expect("thumbnail");
        assert_eq!(thumb.backends, names(&["local"]));
        let thumb_path =
            ObjectKey::derive("documents", None, thumb.id, "photo.png", Some("thumb")).path;
        assert!(local.contains(&thumb_path));
        assert!(!blob.contains(&thumb_path));
    }

    // Shrinking the parent's set cascades: the artifact's copy on the
    // dropped backend is removed too.
    #[tokio::test]
    async fn test_parent_set_shrink_cascades_to_thumbnails() {
        let (store, local, blob) = two_backend_store();
        let mut record = Attachment::new("documents", "photo.png", "image/png");
        store
            .save(
                &mut record,
                SaveRequest::new()
                    .with_payload(image_payload())
                    .with_thumbnail(ThumbnailSpec::new(
                        "thumb",
                        StagedPayload::from_bytes(&b"small"[..], "image/png"),
                    )),
            )
            .await
            .expect("save");

        store
            .save(&mut record, SaveRequest::new().with_backends(["blob"]))
            .await
            .expect("save");

        let thumb = record.thumbnail("thumb").expect("thumbnail");
        assert_eq!(thumb.backends, names(&["blob"]));
        assert_eq!(local.object_count(), 0);
        assert_eq!(blob.object_count(), 2);
    }

    #[tokio::test]
    async fn test_query_surface() {
        let (store, _local, _blob) = two_backend_store();
        let mut record = Attachment::new("documents", "photo.png", "image/png");
        store
            .save(&mut record, SaveRequest::new().with_payload(image_payload()))
            .await
            .expect("save");

        let location = store
            .full_location(&record, "local", None)
            .expect("location");
        assert_eq!(
            location,
            format!("memory://documents/{}/photo.png", record.id)
        );

        // Memory backends neither serve public URLs nor presign.
        assert!(matches!(
            store.public_url(&record, "local", None).unwrap_err(),
            StoreError::Adapter { phase: "url", .. }
        ));
        assert!(matches!(
            store
                .signed_url(&record, "local", None, UrlExpiry::default())
                .await
                .unwrap_err(),
            StoreError::Adapter { phase: "url", .. }
        ));

        assert!(matches!(
            store.full_location(&record, "local", Some("missing")).unwrap_err(),
            StoreError::UnknownThumbnail { .. }
        ));
    }
}
