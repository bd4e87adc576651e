//! Configuration types for kvmesh
//!
//! Defaults used when composition layers are built without explicit
//! parameters. Loaded from TOML; every section is optional.

use crate::error::{Error, Result};
use crate::hash::ShardHasher;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration for kvmesh
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shard router configuration
    pub shard: ShardConfig,
    /// Naive deduplication configuration
    pub dedup: DedupConfig,
    /// Queue configuration
    pub queue: QueueConfig,
    /// Resolver configuration
    pub resolver: ResolverConfig,
}

impl Config {
    /// Parse configuration from a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::configuration(e.to_string()))
    }

    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
            .map_err(|e| e.context(format!("load config {}", path.display())))
    }
}

/// Shard router configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardConfig {
    /// Hash used to route keys
    pub hasher: ShardHasher,
}

/// Naive deduplication configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Number of keys kept after a cleanup pass
    pub max_keys: usize,
    /// Cleanup triggers once `max_keys * clean_factor` keys are stored
    pub clean_factor: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            max_keys: 10_000,
            clean_factor: 2,
        }
    }
}

/// Queue configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of queued items (None = unbounded)
    pub limit: Option<u64>,
}

/// Resolver configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Identifier of the entry record in the bootstrap storage
    pub entry: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            entry: "main".to_string(),
        }
    }
}
