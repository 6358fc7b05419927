//! Multi-backend attachment storage engine.
//!
//! This crate orchestrates the persistence of attached files (and their
//! derived thumbnails) across one or more independently configured storage
//! backends, keeping each record's active-backend set consistent with a
//! declarative policy. It contains ZERO database dependencies; the
//! blob-column adapter lives in `stowage-db`.
//!
//! # Modules
//!
//! - `attachment` - Attachment and thumbnail records, staged payloads
//! - `backend` - Adapter trait, local/remote/memory adapters, dispatch table
//! - `keys` - Storage key derivation and filename sanitizing
//! - `policy` - Active-backend-set resolution
//! - `reconcile` - Diff-and-apply save/destroy cycles, rename coordination
//! - `lifecycle` - Pipeline stage values consumed by host save/destroy hooks
//! - `store` - The `AttachmentStore` facade and query surface

pub mod attachment;
pub mod backend;
pub mod keys;
pub mod lifecycle;
pub mod policy;
pub mod reconcile;
pub mod store;

pub use attachment::{Attachment, StagedPayload, Thumbnail};
pub use backend::{BackendAdapter, BackendError, BackendRegistry, SignedUrl, UrlExpiry};
pub use keys::ObjectKey;
pub use lifecycle::{DestroyOutcome, PreparedSave, SaveOutcome, SaveRequest, ThumbnailSpec};
pub use reconcile::{ReconcilePlan, StoreError};
pub use store::AttachmentStore;
