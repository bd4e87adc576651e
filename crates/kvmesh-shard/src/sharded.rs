//! Storage over a shard pool

use crate::pool::ShardPool;
use kvmesh_common::Result;
use kvmesh_storage::Storage;

/// Storage routing every key to its shard.
///
/// Routed operations never close a shard; shards are closed together with
/// the pool by [`Storage::close`].
pub struct ShardedStorage<P> {
    pool: P,
}

impl<P: ShardPool> ShardedStorage<P> {
    pub const fn new(pool: P) -> Self {
        Self { pool }
    }

    /// Get the underlying pool
    pub const fn pool(&self) -> &P {
        &self.pool
    }
}

impl<P: ShardPool> Storage for ShardedStorage<P> {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.pool.get(key)?.put(key, value)
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.pool.get(key)?.get(key)
    }

    fn del(&self, key: &[u8]) -> Result<()> {
        self.pool.get(key)?.del(key)
    }

    fn keys(&self, visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
        self.pool.iterate(&mut |shard| shard.keys(&mut *visit))
    }

    fn close(&self) -> Result<()> {
        self.pool.close()
    }
}
