//! The attachment store facade.

mod service;

pub use service::{AttachmentStore, AttachmentStoreBuilder};
