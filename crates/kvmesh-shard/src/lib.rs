//! kvmesh Shard - key-hashed storage routing
//!
//! A [`ShardPool`] maps every key to exactly one of N backing storages with
//! `hash(key) mod N`. [`ShardedStorage`] exposes a pool through the plain
//! [`Storage`](kvmesh_storage::Storage) contract.
//!
//! # Pools
//! - [`HashedShardPool`]: shards are opened lazily by a factory keyed by
//!   shard index and kept open until the pool is closed
//! - [`ArrayShardPool`]: shards are an explicit list of ready storages
//!
//! # Example
//! ```ignore
//! use kvmesh_shard::{HashedShardPool, ShardedStorage};
//!
//! let pool = HashedShardPool::new(3, |shard_id| open_shard(shard_id))?;
//! let storage = ShardedStorage::new(pool);
//! storage.put(b"key", b"value")?;
//! ```

pub mod array;
pub mod pool;
pub mod sharded;

pub use array::ArrayShardPool;
pub use pool::{HashShardFn, HashedShardPool, ShardFactory, ShardPool};
pub use sharded::ShardedStorage;
