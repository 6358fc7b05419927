//! Attachment records and staged payloads.

mod payload;
mod types;

pub use payload::StagedPayload;
pub use types::{Attachment, Thumbnail};
