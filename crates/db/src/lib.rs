//! Blob-column storage adapter backed by `SeaORM`.
//!
//! This crate provides:
//! - The `attachment_blobs` `SeaORM` entity
//! - The [`BlobColumnAdapter`] implementing `stowage-core`'s adapter trait
//! - The database migration creating the blob table

pub mod blob;
pub mod entities;
pub mod migration;

pub use blob::BlobColumnAdapter;

use sea_orm::{Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}
