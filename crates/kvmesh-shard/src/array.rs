//! Shard pool over an explicit list of storages

use crate::pool::{HashShardFn, ShardPool, route};
use kvmesh_common::{Error, Result, ShardHasher};
use kvmesh_storage::Storage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Pool whose shard `i` is entry `i` of a list of ready storages.
///
/// Used when shards are built elsewhere, e.g. resolved from configuration.
pub struct ArrayShardPool {
    shards: Vec<Arc<dyn Storage>>,
    hash_fn: HashShardFn,
    closed: AtomicBool,
}

impl ArrayShardPool {
    /// Create a pool routed with CRC-32C
    pub fn new(shards: Vec<Arc<dyn Storage>>) -> Result<Self> {
        Self::with_hasher(shards, ShardHasher::default())
    }

    pub fn with_hasher(shards: Vec<Arc<dyn Storage>>, hasher: ShardHasher) -> Result<Self> {
        Self::with_hash_fn(shards, Arc::new(move |key: &[u8]| hasher.hash(key)))
    }

    pub fn with_hash_fn(shards: Vec<Arc<dyn Storage>>, hash_fn: HashShardFn) -> Result<Self> {
        if shards.is_empty() {
            return Err(Error::configuration("shard pool requires at least one shard"));
        }
        if u32::try_from(shards.len()).is_err() {
            return Err(Error::configuration(format!(
                "too many shards: {}",
                shards.len()
            )));
        }
        debug!("Creating array shard pool with {} shards", shards.len());
        Ok(Self {
            shards,
            hash_fn,
            closed: AtomicBool::new(false),
        })
    }

    /// Index of the shard owning `key`
    #[must_use]
    pub fn shard_index(&self, key: &[u8]) -> u32 {
        route((self.hash_fn)(key), self.shard_count())
    }
}

impl ShardPool for ArrayShardPool {
    fn get(&self, key: &[u8]) -> Result<Arc<dyn Storage>> {
        Ok(self.shards[self.shard_index(key) as usize].clone())
    }

    fn iterate(&self, visit: &mut dyn FnMut(&Arc<dyn Storage>) -> Result<()>) -> Result<()> {
        for shard in &self.shards {
            visit(shard)?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let errors = self
            .shards
            .iter()
            .enumerate()
            .filter_map(|(index, shard)| {
                shard
                    .close()
                    .err()
                    .map(|e| e.context(format!("close shard {index}")))
            })
            .collect();
        Error::aggregate_result(errors)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn shard_count(&self) -> u32 {
        // checked at construction
        self.shards.len() as u32
    }
}
