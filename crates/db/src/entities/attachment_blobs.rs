//! `SeaORM` Entity for the attachment_blobs table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One attachment's bytes stored in a relational blob column.
///
/// Rows are keyed by the record identity, so a logical rename never moves
/// data here. Deletes are soft: the `destroyed` flag is flipped and the
/// row is treated as absent, which tolerates structured rollback.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "attachment_blobs")]
pub struct Model {
    /// Record identity (the thumbnail's own identity for derived
    /// artifacts).
    #[sea_orm(primary_key, auto_increment = false)]
    pub record_id: Uuid,
    /// Owning collection namespace.
    pub collection: String,
    /// Logical filename at the time of the last write.
    pub filename: String,
    /// MIME type of the payload.
    pub content_type: String,
    /// Payload size in bytes.
    pub byte_size: i64,
    /// Hex-encoded SHA-256 checksum of the payload.
    pub checksum_sha256: Option<String>,
    /// The payload bytes.
    pub data: Vec<u8>,
    /// Soft-delete flag; destroyed rows read as absent.
    pub destroyed: bool,
    /// Creation timestamp.
    pub created_at: DateTimeWithTimeZone,
    /// Last write timestamp.
    pub updated_at: DateTimeWithTimeZone,
}

/// Entity relations (none).
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
