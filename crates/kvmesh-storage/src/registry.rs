//! Backend registry
//!
//! Maps a URL scheme (`memory`, `nop`, ...) to a factory that builds a
//! backend from the parsed URL. The registry is an explicit value handed to
//! whoever needs to build leaves, so tests can use their own fakes.

use crate::memory::MemoryStorage;
use crate::nop::NopStorage;
use crate::storage::Storage;
use kvmesh_common::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Factory building a backend from its URL
pub type BackendFactory = Arc<dyn Fn(&Url) -> Result<Arc<dyn Storage>> + Send + Sync>;

/// Registry of backend factories keyed by URL scheme
#[derive(Default)]
pub struct BackendRegistry {
    factories: RwLock<HashMap<String, BackendFactory>>,
}

impl BackendRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the in-process backends (`memory`, `nop`)
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register("memory", |_| Ok(Arc::new(MemoryStorage::new())));
        registry.register("nop", |_| Ok(Arc::new(NopStorage::new())));
        registry
    }

    /// Register (or replace) the factory for a scheme
    pub fn register<F>(&self, scheme: &str, factory: F)
    where
        F: Fn(&Url) -> Result<Arc<dyn Storage>> + Send + Sync + 'static,
    {
        self.factories
            .write()
            .insert(scheme.to_lowercase(), Arc::new(factory));
    }

    /// Check whether a scheme is registered
    #[must_use]
    pub fn supports(&self, scheme: &str) -> bool {
        self.factories.read().contains_key(&scheme.to_lowercase())
    }

    /// Registered schemes, sorted
    #[must_use]
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.factories.read().keys().cloned().collect();
        schemes.sort();
        schemes
    }

    /// Build a backend from its URL
    pub fn create(&self, raw_url: &str) -> Result<Arc<dyn Storage>> {
        let url = Url::parse(raw_url)
            .map_err(|e| Error::configuration(format!("invalid storage URL '{raw_url}': {e}")))?;
        // Clone the factory out so it runs without the registry lock held
        let factory = self
            .factories
            .read()
            .get(url.scheme())
            .cloned()
            .ok_or_else(|| Error::UnsupportedScheme(url.scheme().to_string()))?;
        debug!("Creating {} backend", url.scheme());
        factory(&url)
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
