//! kvmesh Queue - persistent FIFO queues over any storage
//!
//! [`SequencedQueue`] keeps items under 8-byte big-endian sequence numbers
//! next to two sentinel keys, `oldest` and `latest`, so a queue reopened on
//! the same storage continues where it stopped. [`LimitedQueue`] bounds the
//! number of items by dropping the oldest ones.

pub mod limited;
pub mod sequenced;

pub use limited::LimitedQueue;
pub use sequenced::{QueueIter, SequencedQueue};

use kvmesh_common::Result;
use kvmesh_common::config::QueueConfig;
use kvmesh_storage::Storage;
use std::sync::Arc;

/// Thread-safe FIFO queue
pub trait Queue: Send + Sync {
    /// Append an item
    fn put(&self, data: &[u8]) -> Result<()>;

    /// Oldest item, kept in the queue. `NotFound` if empty.
    fn peek(&self) -> Result<Vec<u8>>;

    /// Drop the oldest item. `NotFound` if empty.
    fn discard(&self) -> Result<()>;

    /// Remove and return the oldest item, atomically. `NotFound` if empty.
    fn get(&self) -> Result<Vec<u8>>;
}

/// Open a queue over `storage`, bounded when the configuration sets a limit
pub fn open(storage: Arc<dyn Storage>, config: &QueueConfig) -> Result<Box<dyn Queue>> {
    let queue = SequencedQueue::new(storage)?;
    Ok(match config.limit {
        Some(limit) => Box::new(LimitedQueue::new(queue, limit)?),
        None => Box::new(queue),
    })
}
