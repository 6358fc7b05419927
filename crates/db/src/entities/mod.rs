//! `SeaORM` entity definitions.

pub mod attachment_blobs;
