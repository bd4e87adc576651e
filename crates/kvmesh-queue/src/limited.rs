//! Size-bounded queue
//!
//! Keeps at most `limit` items: after each put the oldest items are dropped
//! until the bound holds again. Trimming is best-effort and never fails a put.

use crate::Queue;
use crate::sequenced::SequencedQueue;
use kvmesh_common::{Error, Result};
use kvmesh_storage::Storage;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Queue keeping only the most recent `limit` items
pub struct LimitedQueue {
    queue: SequencedQueue,
    limit: u64,
    /// Makes put + trim atomic for users of this wrapper
    lock: Mutex<()>,
}

impl LimitedQueue {
    pub fn new(queue: SequencedQueue, limit: u64) -> Result<Self> {
        if limit == 0 {
            return Err(Error::configuration("queue limit must be at least 1"));
        }
        Ok(Self {
            queue,
            limit,
            lock: Mutex::new(()),
        })
    }

    /// Open a sequenced queue over `storage` and bound it
    pub fn open(storage: Arc<dyn Storage>, limit: u64) -> Result<Self> {
        Self::new(SequencedQueue::new(storage)?, limit)
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Free slots left before trimming starts
    #[must_use]
    pub fn available(&self) -> u64 {
        let _guard = self.lock.lock();
        self.limit.saturating_sub(self.queue.size())
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.queue.size()
    }

    /// Underlying queue
    #[must_use]
    pub const fn inner(&self) -> &SequencedQueue {
        &self.queue
    }

    fn trim(&self) {
        while self.queue.size() > self.limit {
            if let Err(e) = self.queue.discard() {
                warn!(
                    "Failed to trim queue to {} items (size {}): {}",
                    self.limit,
                    self.queue.size(),
                    e
                );
                metrics::counter!("kvmesh_queue_trim_failures_total").increment(1);
                break;
            }
        }
    }
}

impl Queue for LimitedQueue {
    fn put(&self, data: &[u8]) -> Result<()> {
        let _guard = self.lock.lock();
        self.queue.put(data)?;
        self.trim();
        Ok(())
    }

    fn peek(&self) -> Result<Vec<u8>> {
        let _guard = self.lock.lock();
        self.queue.peek()
    }

    fn discard(&self) -> Result<()> {
        let _guard = self.lock.lock();
        self.queue.discard()
    }

    fn get(&self) -> Result<Vec<u8>> {
        let _guard = self.lock.lock();
        self.queue.get()
    }
}
