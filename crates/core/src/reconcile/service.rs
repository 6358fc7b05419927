//! The reconciliation engine.
//!
//! Runs the per-record save and destroy cycles: resolve the target set,
//! stage the payload once, diff against the previous set, execute the
//! write/delete phases sequentially, and commit the new set only after
//! every phase succeeded. Derived artifacts re-enter the same pipeline
//! with the parent's resolved set unless they carry their own override.

use tracing::{debug, info};
use uuid::Uuid;

use super::error::StoreError;
use super::plan::ReconcilePlan;
use super::rename::rename_on_backends;
use crate::attachment::{Attachment, StagedPayload, Thumbnail};
use crate::backend::{BackendAdapter, BackendRegistry};
use crate::keys::ObjectKey;
use crate::lifecycle::{
    DestroyOutcome, PreparedSave, PreparedThumbnail, SaveOutcome, SaveRequest, ThumbnailSpec,
};
use crate::policy::resolve_active_set;

/// One collection's reconciliation engine: the dispatch table plus the
/// declarative pieces selection and key derivation need.
pub struct Engine<'a> {
    registry: &'a BackendRegistry,
    defaults: &'a [String],
    path_prefix: Option<&'a str>,
}

impl<'a> Engine<'a> {
    /// Create an engine over a collection's registry and declaration.
    #[must_use]
    pub fn new(
        registry: &'a BackendRegistry,
        defaults: &'a [String],
        path_prefix: Option<&'a str>,
    ) -> Self {
        Self {
            registry,
            defaults,
            path_prefix,
        }
    }

    fn key(&self, collection: &str, id: Uuid, filename: &str, suffix: Option<&str>) -> ObjectKey {
        ObjectKey::derive(collection, self.path_prefix, id, filename, suffix)
    }

    /// Before-save stage: resolve the target set, compute the plan, and
    /// stage payloads. Policy errors surface here, before any write.
    ///
    /// When backends are added without a fresh upload, bytes are staged
    /// by reading from one of the previously active backends, so partial
    /// reconfiguration needs no re-upload.
    ///
    /// # Errors
    ///
    /// Returns resolution errors, staging fetch failures, or
    /// [`StoreError::MissingPayload`] when a backend needs bytes no
    /// source can provide.
    pub async fn prepare_save(
        &self,
        record: &Attachment,
        mut request: SaveRequest,
    ) -> Result<PreparedSave, StoreError> {
        let target = resolve_active_set(
            &record.collection,
            request.backend_override.as_deref(),
            &record.backends,
            self.defaults,
            self.registry,
        )?;
        let plan = ReconcilePlan::diff(&target, &record.backends);
        debug!(
            collection = %record.collection,
            record_id = %record.id,
            resolved = ?target,
            to_add = plan.to_add.len(),
            to_remove = plan.to_remove.len(),
            "save cycle planned"
        );

        let rename = record.rename_pending();
        let stored_name = record
            .previous_filename
            .clone()
            .unwrap_or_else(|| record.filename.clone());

        // Stage the parent payload exactly once for all consuming backends.
        let supplied = request.payload.take();
        let payload_changed = supplied
            .as_ref()
            .is_some_and(|p| record.checksum_sha256.as_deref() != Some(p.checksum_sha256()));
        let payload = match supplied {
            Some(p) => Some(p),
            None if !plan.to_add.is_empty() => {
                let source_key = self.key(&record.collection, record.id, &stored_name, None);
                Some(
                    self.stage_from_backends(&record.backends, &source_key, &record.content_type)
                        .await?,
                )
            }
            None => None,
        };

        let mut specs: Vec<ThumbnailSpec> = std::mem::take(&mut request.thumbnails);
        let mut thumbnails = Vec::new();

        // Existing artifacts reconcile every cycle; matching specs refresh
        // their bytes or override.
        for thumb in &record.thumbnails {
            let spec = specs
                .iter()
                .position(|s| s.suffix == thumb.suffix)
                .map(|i| specs.remove(i));
            let backend_override = spec
                .as_ref()
                .and_then(|s| s.backend_override.clone())
                .or_else(|| thumb.backend_override.clone());
            let t_target = resolve_active_set(
                &record.collection,
                Some(backend_override.as_deref().unwrap_or(&target)),
                &thumb.backends,
                self.defaults,
                self.registry,
            )?;
            let t_plan = ReconcilePlan::diff(&t_target, &thumb.backends);

            let t_supplied = spec.and_then(|s| s.payload);
            let payload_changed = t_supplied.is_some();
            let t_payload = match t_supplied {
                Some(p) => Some(p),
                None if !t_plan.to_add.is_empty() => {
                    let source_key = self.key(
                        &record.collection,
                        thumb.id,
                        &stored_name,
                        Some(&thumb.suffix),
                    );
                    Some(
                        self.stage_from_backends(
                            &thumb.backends,
                            &source_key,
                            &record.content_type,
                        )
                        .await?,
                    )
                }
                None => None,
            };

            thumbnails.push(PreparedThumbnail {
                id: thumb.id,
                is_new: false,
                suffix: thumb.suffix.clone(),
                target: t_target,
                plan: t_plan,
                payload: t_payload,
                payload_changed,
                backend_override,
            });
        }

        // Remaining specs create new artifacts inheriting the parent's set.
        for spec in specs {
            let id = Uuid::new_v4();
            let backend_override = spec.backend_override.clone();
            let t_target = resolve_active_set(
                &record.collection,
                Some(backend_override.as_deref().unwrap_or(&target)),
                &[],
                self.defaults,
                self.registry,
            )?;
            let t_plan = ReconcilePlan::diff(&t_target, &[]);
            let Some(payload) = spec.payload else {
                let key =
                    self.key(&record.collection, id, &record.filename, Some(&spec.suffix));
                return Err(StoreError::missing_payload(key.path));
            };

            thumbnails.push(PreparedThumbnail {
                id,
                is_new: true,
                suffix: spec.suffix,
                target: t_target,
                plan: t_plan,
                payload: Some(payload),
                payload_changed: true,
                backend_override,
            });
        }

        Ok(PreparedSave {
            target,
            plan,
            payload,
            payload_changed,
            rename,
            thumbnails,
        })
    }

    /// After-commit stage: rename, write, and delete phases, then commit
    /// of the new active set onto the record.
    ///
    /// Any fatal adapter error aborts before the commit, so the record
    /// keeps its last known-good set (at most one state transition per
    /// save).
    ///
    /// # Errors
    ///
    /// Returns the first fatal adapter or rename error.
    pub async fn complete_save(
        &self,
        record: &mut Attachment,
        prepared: PreparedSave,
    ) -> Result<SaveOutcome, StoreError> {
        let PreparedSave {
            target,
            plan,
            payload,
            payload_changed,
            rename,
            thumbnails,
        } = prepared;

        // Rename phase: kept backends move from the shadow name first.
        if rename {
            if let Some(old_name) = record.previous_filename.clone() {
                let old_key = self.key(&record.collection, record.id, &old_name, None);
                let new_key = self.key(&record.collection, record.id, &record.filename, None);
                rename_on_backends(self.registry, &plan.to_update, &old_key, &new_key).await?;

                for thumb in &thumbnails {
                    if thumb.is_new {
                        continue;
                    }
                    let t_old =
                        self.key(&record.collection, thumb.id, &old_name, Some(&thumb.suffix));
                    let t_new = self.key(
                        &record.collection,
                        thumb.id,
                        &record.filename,
                        Some(&thumb.suffix),
                    );
                    rename_on_backends(self.registry, &thumb.plan.to_update, &t_old, &t_new)
                        .await?;
                }
            }
        }

        // Dropped backends were not renamed; their data still lives under
        // the shadow name when a rename was pending.
        let removal_name = if rename {
            record
                .previous_filename
                .clone()
                .unwrap_or_else(|| record.filename.clone())
        } else {
            record.filename.clone()
        };

        // Write phase (parent).
        let parent_key = self.key(&record.collection, record.id, &record.filename, None);
        for name in &plan.to_add {
            let bytes = payload
                .as_ref()
                .ok_or_else(|| StoreError::missing_payload(&parent_key.path))?;
            self.store_on(name, &parent_key, bytes).await?;
        }
        if payload_changed {
            for name in &plan.to_update {
                let bytes = payload
                    .as_ref()
                    .ok_or_else(|| StoreError::missing_payload(&parent_key.path))?;
                self.store_on(name, &parent_key, bytes).await?;
            }
        }

        // Delete phase (parent).
        let removal_key = self.key(&record.collection, record.id, &removal_name, None);
        for name in &plan.to_remove {
            self.delete_ignoring_missing(name, &removal_key).await?;
        }

        // Cascade: write/delete phases per artifact.
        for thumb in &thumbnails {
            let t_key = self.key(
                &record.collection,
                thumb.id,
                &record.filename,
                Some(&thumb.suffix),
            );
            for name in &thumb.plan.to_add {
                let bytes = thumb
                    .payload
                    .as_ref()
                    .ok_or_else(|| StoreError::missing_payload(&t_key.path))?;
                self.store_on(name, &t_key, bytes).await?;
            }
            if thumb.payload_changed {
                for name in &thumb.plan.to_update {
                    let bytes = thumb
                        .payload
                        .as_ref()
                        .ok_or_else(|| StoreError::missing_payload(&t_key.path))?;
                    self.store_on(name, &t_key, bytes).await?;
                }
            }
            let t_removal_key = self.key(
                &record.collection,
                thumb.id,
                &removal_name,
                Some(&thumb.suffix),
            );
            for name in &thumb.plan.to_remove {
                self.delete_ignoring_missing(name, &t_removal_key).await?;
            }
        }

        // Commit: the record claims the new set only now.
        if let Some(p) = &payload {
            record.byte_size = p.byte_size();
            record.content_type = p.content_type().to_string();
            record.checksum_sha256 = Some(p.checksum_sha256().to_string());
        }
        record.previous_filename = None;
        record.backends.clone_from(&target);
        for thumb in thumbnails {
            if thumb.is_new {
                record.thumbnails.push(Thumbnail {
                    id: thumb.id,
                    parent_id: record.id,
                    suffix: thumb.suffix,
                    backends: thumb.target,
                    backend_override: thumb.backend_override,
                });
            } else if let Some(existing) =
                record.thumbnails.iter_mut().find(|t| t.id == thumb.id)
            {
                existing.backends = thumb.target;
                existing.backend_override = thumb.backend_override;
            }
        }

        info!(
            collection = %record.collection,
            record_id = %record.id,
            backends = ?record.backends,
            renamed = rename,
            "attachment reconciled"
        );

        Ok(SaveOutcome {
            active_backends: record.backends.clone(),
            added: plan.to_add,
            updated: if payload_changed {
                plan.to_update
            } else {
                Vec::new()
            },
            removed: plan.to_remove,
            renamed: rename,
        })
    }

    /// Destroy cycle: no resolution, just the delete phase over the full
    /// previous set, then over every artifact's own set.
    ///
    /// Absent objects are treated as already deleted. When a rename was
    /// still pending, keys under both the current and the shadow name are
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns the first fatal adapter error.
    pub async fn destroy(&self, record: &mut Attachment) -> Result<DestroyOutcome, StoreError> {
        let shadow = record.previous_filename.clone();
        let mut removed = Vec::new();

        for name in &record.backends {
            let current = self.key(&record.collection, record.id, &record.filename, None);
            self.delete_ignoring_missing(name, &current).await?;
            if let Some(old_name) = &shadow {
                let old = self.key(&record.collection, record.id, old_name, None);
                self.delete_ignoring_missing(name, &old).await?;
            }
            removed.push(name.clone());
        }

        let mut thumbnails_removed = 0;
        for thumb in &record.thumbnails {
            if thumb.backends.is_empty() {
                continue;
            }
            for name in &thumb.backends {
                let current = self.key(
                    &record.collection,
                    thumb.id,
                    &record.filename,
                    Some(&thumb.suffix),
                );
                self.delete_ignoring_missing(name, &current).await?;
                if let Some(old_name) = &shadow {
                    let old =
                        self.key(&record.collection, thumb.id, old_name, Some(&thumb.suffix));
                    self.delete_ignoring_missing(name, &old).await?;
                }
            }
            thumbnails_removed += 1;
        }

        record.backends.clear();
        record.previous_filename = None;
        record.thumbnails.clear();

        info!(
            collection = %record.collection,
            record_id = %record.id,
            backends = removed.len(),
            thumbnails = thumbnails_removed,
            "attachment destroyed"
        );

        Ok(DestroyOutcome {
            removed,
            thumbnails_removed,
        })
    }

    async fn stage_from_backends(
        &self,
        names: &[String],
        key: &ObjectKey,
        content_type: &str,
    ) -> Result<StagedPayload, StoreError> {
        for name in names {
            let Some(adapter) = self.registry.get(name) else {
                continue;
            };
            match adapter.fetch(key).await {
                Ok(bytes) => return Ok(StagedPayload::from_bytes(bytes, content_type)),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(StoreError::adapter(name, "fetch", e)),
            }
        }
        Err(StoreError::missing_payload(&key.path))
    }

    async fn store_on(
        &self,
        name: &str,
        key: &ObjectKey,
        payload: &StagedPayload,
    ) -> Result<(), StoreError> {
        let adapter = self
            .registry
            .get(name)
            .ok_or_else(|| StoreError::unknown_backend(name, &key.collection))?;
        adapter
            .store(key, payload)
            .await
            .map_err(|e| StoreError::adapter(name, "store", e))
    }

    async fn delete_ignoring_missing(
        &self,
        name: &str,
        key: &ObjectKey,
    ) -> Result<(), StoreError> {
        let adapter = self
            .registry
            .get(name)
            .ok_or_else(|| StoreError::unknown_backend(name, &key.collection))?;
        match adapter.delete(key).await {
            Ok(()) => Ok(()),
            // Absence is the desired state.
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(StoreError::adapter(name, "delete", e)),
        }
    }
}
