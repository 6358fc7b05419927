//! Storage backend adapters.
//!
//! One uniform capability surface ([`BackendAdapter`]) over heterogeneous
//! storage media:
//! - [`LocalPathAdapter`] - filesystem paths under a root, atomic writes
//! - [`RemoteObjectAdapter`] - S3-compatible / Azure Blob via Apache OpenDAL
//! - [`MemoryAdapter`] - in-process map with an operation journal
//! - the blob-column adapter lives in `stowage-db` (it needs a database
//!   connection) and plugs into the same [`BackendRegistry`]

mod adapter;
mod error;
mod local;
mod memory;
mod registry;
mod remote;

pub use adapter::{BackendAdapter, DEFAULT_SIGNED_URL_TTL, SignedUrl, UrlExpiry};
pub use error::BackendError;
pub use local::LocalPathAdapter;
pub use memory::{MemoryAdapter, Operation};
pub use registry::BackendRegistry;
pub use remote::RemoteObjectAdapter;
