//! Shared configuration types for Stowage.
//!
//! This crate provides the declarative storage configuration consumed by
//! both the engine (`stowage-core`) and the database adapter (`stowage-db`):
//! - Per-collection backend declarations (name → adapter parameters)
//! - Default backend sets and key-prefix overrides
//! - Layered configuration loading (files + environment)

pub mod config;

pub use config::{
    AccessPolicy, BackendSettings, CollectionSettings, RemoteProvider, SettingsError,
    StorageSettings,
};
