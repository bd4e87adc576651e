//! Shard pools
//!
//! A pool owns N shard slots and routes each key to `hash(key) mod N`.
//! The routing function is fixed for the lifetime of the pool.

use kvmesh_common::{Error, Result, ShardHasher};
use kvmesh_storage::Storage;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Key hash used for routing, must be deterministic
pub type HashShardFn = Arc<dyn Fn(&[u8]) -> u32 + Send + Sync>;

/// Factory opening the shard with the given index
pub type ShardFactory = Box<dyn Fn(u32) -> Result<Arc<dyn Storage>> + Send + Sync>;

/// Fixed set of shards addressed by key
pub trait ShardPool: Send + Sync {
    /// Storage responsible for `key`
    fn get(&self, key: &[u8]) -> Result<Arc<dyn Storage>>;

    /// Visit every shard once, in index order. Stops on the first visitor error.
    fn iterate(&self, visit: &mut dyn FnMut(&Arc<dyn Storage>) -> Result<()>) -> Result<()>;

    /// Close every opened shard
    fn close(&self) -> Result<()>;

    /// Number of shards
    fn shard_count(&self) -> u32;
}

/// Route a key hash onto `count` shards
pub(crate) fn route(hash: u32, count: u32) -> u32 {
    hash % count
}

struct ShardSlot {
    storage: OnceLock<Arc<dyn Storage>>,
    init: Mutex<()>,
}

impl ShardSlot {
    fn new() -> Self {
        Self {
            storage: OnceLock::new(),
            init: Mutex::new(()),
        }
    }
}

/// Pool opening its shards lazily through a factory.
///
/// Each shard is built at most once, on first access, and cached until the
/// pool is closed. A failed build is not cached; the next access retries.
pub struct HashedShardPool {
    slots: Vec<ShardSlot>,
    hash_fn: HashShardFn,
    factory: ShardFactory,
    closed: AtomicBool,
}

impl HashedShardPool {
    /// Create a pool of `shards` slots routed with CRC-32C
    pub fn new<F>(shards: u32, factory: F) -> Result<Self>
    where
        F: Fn(u32) -> Result<Arc<dyn Storage>> + Send + Sync + 'static,
    {
        Self::with_hasher(shards, ShardHasher::default(), factory)
    }

    /// Create a pool routed with one of the built-in hashers
    pub fn with_hasher<F>(shards: u32, hasher: ShardHasher, factory: F) -> Result<Self>
    where
        F: Fn(u32) -> Result<Arc<dyn Storage>> + Send + Sync + 'static,
    {
        Self::with_hash_fn(shards, Arc::new(move |key: &[u8]| hasher.hash(key)), factory)
    }

    /// Create a pool routed with a custom hash function
    pub fn with_hash_fn<F>(shards: u32, hash_fn: HashShardFn, factory: F) -> Result<Self>
    where
        F: Fn(u32) -> Result<Arc<dyn Storage>> + Send + Sync + 'static,
    {
        if shards == 0 {
            return Err(Error::configuration("shard pool requires at least one shard"));
        }
        debug!("Creating hashed shard pool with {} shards", shards);
        Ok(Self {
            slots: (0..shards).map(|_| ShardSlot::new()).collect(),
            hash_fn,
            factory: Box::new(factory),
            closed: AtomicBool::new(false),
        })
    }

    /// Index of the shard owning `key`
    #[must_use]
    pub fn shard_index(&self, key: &[u8]) -> u32 {
        route((self.hash_fn)(key), self.shard_count())
    }

    /// Number of shards built so far
    #[must_use]
    pub fn opened(&self) -> usize {
        self.slots.iter().filter(|s| s.storage.get().is_some()).count()
    }

    fn shard(&self, index: u32) -> Result<Arc<dyn Storage>> {
        let slot = &self.slots[index as usize];
        if let Some(storage) = slot.storage.get() {
            return Ok(storage.clone());
        }

        let _guard = slot.init.lock();
        if let Some(storage) = slot.storage.get() {
            return Ok(storage.clone());
        }
        let storage = (self.factory)(index).map_err(|e| e.context(format!("open shard {index}")))?;
        info!("Opened shard {}/{}", index, self.shard_count());
        Ok(slot.storage.get_or_init(|| storage).clone())
    }
}

impl ShardPool for HashedShardPool {
    fn get(&self, key: &[u8]) -> Result<Arc<dyn Storage>> {
        self.shard(self.shard_index(key))
    }

    fn iterate(&self, visit: &mut dyn FnMut(&Arc<dyn Storage>) -> Result<()>) -> Result<()> {
        for index in 0..self.shard_count() {
            let shard = self.shard(index)?;
            visit(&shard)?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut errors = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            // never-opened shards stay unopened
            let Some(storage) = slot.storage.get() else {
                continue;
            };
            if let Err(e) = storage.close() {
                errors.push(e.context(format!("close shard {index}")));
            }
        }
        debug!("Closed hashed shard pool, {} shard errors", errors.len());
        Error::aggregate_result(errors)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn shard_count(&self) -> u32 {
        // bounded by the u32 passed at construction
        self.slots.len() as u32
    }
}
