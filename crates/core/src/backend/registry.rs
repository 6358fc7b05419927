//! Backend dispatch table.

use std::collections::HashMap;
use std::sync::Arc;

use stowage_shared::{BackendSettings, CollectionSettings};

use super::adapter::BackendAdapter;
use super::error::BackendError;
use super::local::LocalPathAdapter;
use super::memory::MemoryAdapter;
use super::remote::RemoteObjectAdapter;

/// Closed dispatch table mapping backend-name tokens to adapters.
///
/// Resolved once at configuration load; lookups at save time never
/// construct adapters. Names outside the table are unknown backends.
#[derive(Default)]
pub struct BackendRegistry {
    adapters: HashMap<String, Arc<dyn BackendAdapter>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry for one collection's declaration.
    ///
    /// Declared local/remote/memory backends are constructed here;
    /// `host_adapters` supplies externally constructed ones (the
    /// blob-column adapter needs a live database connection), keyed by
    /// backend name. A host adapter may also override a declared one.
    ///
    /// # Errors
    ///
    /// Returns an error if a remote operator cannot be initialized or a
    /// `blob` declaration has no host-registered adapter.
    pub fn from_settings(
        settings: &CollectionSettings,
        mut host_adapters: HashMap<String, Arc<dyn BackendAdapter>>,
    ) -> Result<Self, BackendError> {
        let mut registry = Self::new();

        for (name, backend) in &settings.backends {
            if let Some(adapter) = host_adapters.remove(name) {
                registry.register(name.clone(), adapter);
                continue;
            }
            let adapter: Arc<dyn BackendAdapter> = match backend {
                BackendSettings::Local { root } => Arc::new(LocalPathAdapter::new(root.clone())),
                BackendSettings::Remote {
                    provider,
                    prefix,
                    acl,
                } => Arc::new(RemoteObjectAdapter::from_provider(
                    provider.clone(),
                    prefix.clone(),
                    *acl,
                )?),
                BackendSettings::Memory => Arc::new(MemoryAdapter::new()),
                BackendSettings::Blob => {
                    return Err(BackendError::configuration(format!(
                        "backend '{name}' is blob-column and must be registered by the host"
                    )));
                }
            };
            registry.register(name.clone(), adapter);
        }

        // Host adapters for undeclared names are still reachable by
        // explicit override, so keep them.
        for (name, adapter) in host_adapters {
            registry.register(name, adapter);
        }

        Ok(registry)
    }

    /// Register (or replace) a named adapter.
    pub fn register(&mut self, name: impl Into<String>, adapter: Arc<dyn BackendAdapter>) {
        self.adapters.insert(name.into(), adapter);
    }

    /// Look up an adapter by name token.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn BackendAdapter>> {
        self.adapters.get(name)
    }

    /// Whether a name token is configured.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// Configured backend names, sorted for stable output.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("names", &self.names())
            .finish()
    }
}
