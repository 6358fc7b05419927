//! Storage configuration management.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Underlying configuration source failed to load or deserialize.
    #[error("configuration load error: {0}")]
    Load(#[from] config::ConfigError),

    /// A collection declares a default backend that is not configured.
    #[error("collection '{collection}' lists unknown default backend '{name}'")]
    UnknownDefault {
        /// Collection whose defaults are invalid.
        collection: String,
        /// The unconfigured backend name.
        name: String,
    },

    /// A collection declares no backends at all.
    #[error("collection '{collection}' configures no backends")]
    EmptyCollection {
        /// The offending collection.
        collection: String,
    },
}

/// Access flag forwarded to remote object stores.
///
/// Governs whether objects are addressable by a plain public URL or only
/// through time-bounded signed URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    /// Anyone holding the URL may read.
    PublicRead,
    /// Reads require a signed URL.
    #[default]
    Private,
    /// Reads require an authenticated, signed request.
    AuthenticatedRead,
}

impl AccessPolicy {
    /// String form used in configuration and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PublicRead => "public_read",
            Self::Private => "private",
            Self::AuthenticatedRead => "authenticated_read",
        }
    }
}

/// Remote object-store provider parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteProvider {
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, DigitalOcean Spaces
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
    },
    /// Azure Blob Storage
    AzureBlob {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        access_key: String,
        /// Azure container name.
        container: String,
    },
}

impl RemoteProvider {
    /// Create an S3-compatible provider (Cloudflare R2, Supabase, AWS S3).
    #[must_use]
    pub fn s3(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::S3 {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Create an Azure Blob Storage provider.
    #[must_use]
    pub fn azure_blob(
        account: impl Into<String>,
        access_key: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self::AzureBlob {
            account: account.into(),
            access_key: access_key.into(),
            container: container.into(),
        }
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::S3 { bucket, .. } => bucket,
            Self::AzureBlob { container, .. } => container,
        }
    }
}

/// Adapter parameters for one named backend of a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendSettings {
    /// Local filesystem storage rooted at a directory.
    Local {
        /// Root directory all keys resolve under.
        root: PathBuf,
    },
    /// Relational blob-column storage; the adapter itself is registered by
    /// the host because it needs a live database connection.
    Blob,
    /// Remote object storage addressed through OpenDAL.
    Remote {
        /// Provider parameters.
        provider: RemoteProvider,
        /// Optional key prefix inside the bucket.
        #[serde(default)]
        prefix: Option<String>,
        /// Access flag applied to stored objects.
        #[serde(default)]
        acl: AccessPolicy,
    },
    /// In-process memory storage for tests and ephemeral deployments.
    Memory,
}

/// Per-collection backend declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionSettings {
    /// Backend name token → adapter parameters.
    pub backends: HashMap<String, BackendSettings>,
    /// Backend names newly created records default to.
    #[serde(default)]
    pub defaults: Vec<String>,
    /// Optional override for the first key segment (defaults to the
    /// collection name).
    #[serde(default)]
    pub path_prefix: Option<String>,
}

impl CollectionSettings {
    /// Create an empty declaration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named backend.
    #[must_use]
    pub fn with_backend(mut self, name: impl Into<String>, settings: BackendSettings) -> Self {
        self.backends.insert(name.into(), settings);
        self
    }

    /// Set the default backend names.
    #[must_use]
    pub fn with_defaults<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the key-prefix override.
    #[must_use]
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    /// Check that every default names a configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection has no backends or a default
    /// references an unknown name.
    pub fn validate(&self, collection: &str) -> Result<(), SettingsError> {
        if self.backends.is_empty() {
            return Err(SettingsError::EmptyCollection {
                collection: collection.to_string(),
            });
        }
        for name in &self.defaults {
            if !self.backends.contains_key(name) {
                return Err(SettingsError::UnknownDefault {
                    collection: collection.to_string(),
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Root storage settings: one declaration per record collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Collection name → backend declaration.
    pub collections: HashMap<String, CollectionSettings>,
}

impl StorageSettings {
    /// Create empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection declaration.
    #[must_use]
    pub fn with_collection(
        mut self,
        name: impl Into<String>,
        settings: CollectionSettings,
    ) -> Self {
        self.collections.insert(name.into(), settings);
        self
    }

    /// Look up a collection declaration.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&CollectionSettings> {
        self.collections.get(name)
    }

    /// Validate every collection declaration.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure encountered.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, collection) in &self.collections {
            collection.validate(name)?;
        }
        Ok(())
    }

    /// Loads settings from configuration files and the environment.
    ///
    /// Reads `config/default`, then `config/{RUN_MODE}`, then
    /// `STOWAGE__`-prefixed environment variables, each layer overriding
    /// the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or fails
    /// validation.
    pub fn load() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("STOWAGE").separator("__"))
            .build()?;

        let settings: Self = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}
