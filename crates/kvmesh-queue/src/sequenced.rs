//! Sequenced queue
//!
//! Storage layout:
//! - `oldest`: sequence of the oldest item (8-byte BE), absent means 1
//! - `latest`: last used sequence (8-byte BE), absent or 0 means unused
//! - `<be64 sequence>`: item data
//!
//! Data is written before the `latest` sentinel advances, so a crash between
//! the two writes leaves an orphan entry that the next put overwrites.

use crate::Queue;
use kvmesh_common::{Error, Result};
use kvmesh_storage::Storage;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

const OLDEST_KEY: &[u8] = b"oldest";
const LATEST_KEY: &[u8] = b"latest";

#[derive(Clone, Copy, Debug)]
struct Cursor {
    oldest: u64,
    latest: u64,
}

impl Cursor {
    const fn is_empty(self) -> bool {
        self.latest == 0 || self.oldest > self.latest
    }

    const fn size(self) -> u64 {
        self.latest.saturating_add(1).saturating_sub(self.oldest)
    }
}

fn sequence_key(sequence: u64) -> [u8; 8] {
    sequence.to_be_bytes()
}

fn load_sequence(storage: &dyn Storage, key: &[u8]) -> Result<u64> {
    match storage.get(key) {
        Ok(raw) => <[u8; 8]>::try_from(raw.as_slice())
            .map(u64::from_be_bytes)
            .map_err(|_| {
                Error::corrupted(format!(
                    "sequence '{}' has {} bytes, 8 required",
                    String::from_utf8_lossy(key),
                    raw.len()
                ))
            }),
        Err(e) if e.is_not_found() => Ok(0),
        Err(e) => Err(e),
    }
}

/// FIFO queue persisted in a storage.
///
/// Sequence numbers strictly increase and are never reused, also across
/// restarts. The storage must not be shared with other writers.
pub struct SequencedQueue {
    storage: Arc<dyn Storage>,
    cursor: RwLock<Cursor>,
}

impl SequencedQueue {
    /// Open a queue, recovering its position from the sentinels
    pub fn new(storage: Arc<dyn Storage>) -> Result<Self> {
        let oldest = load_sequence(storage.as_ref(), OLDEST_KEY)
            .map_err(|e| e.context("load oldest sequence"))?;
        let latest = load_sequence(storage.as_ref(), LATEST_KEY)
            .map_err(|e| e.context("load latest sequence"))?;
        let oldest = oldest.max(1);

        if oldest > latest && oldest - latest > 1 {
            return Err(Error::corrupted(format!(
                "oldest sequence {oldest} is ahead of latest sequence {latest}"
            )));
        }
        debug!("Opened queue: oldest {}, latest {}", oldest, latest);

        Ok(Self {
            storage,
            cursor: RwLock::new(Cursor { oldest, latest }),
        })
    }

    /// Number of queued items
    #[must_use]
    pub fn size(&self) -> u64 {
        self.cursor.read().size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursor.read().is_empty()
    }

    /// Sequence of the oldest item
    #[must_use]
    pub fn oldest(&self) -> u64 {
        self.cursor.read().oldest
    }

    /// Last used sequence, 0 if the queue was never written
    #[must_use]
    pub fn latest(&self) -> u64 {
        self.cursor.read().latest
    }

    /// Iterate over `(sequence, data)` from oldest to latest.
    ///
    /// The range is captured now. Iteration ends at the first missing entry;
    /// a storage error is yielded once and ends it as well.
    #[must_use]
    pub fn iter(&self) -> QueueIter {
        let cursor = *self.cursor.read();
        QueueIter {
            storage: self.storage.clone(),
            next: cursor.oldest,
            last: cursor.latest,
        }
    }

    fn peek_at(&self, cursor: Cursor) -> Result<Vec<u8>> {
        if cursor.is_empty() {
            return Err(Error::NotFound);
        }
        self.storage.get(&sequence_key(cursor.oldest))
    }

    fn discard_at(&self, cursor: &mut Cursor) -> Result<()> {
        if cursor.is_empty() {
            return Err(Error::NotFound);
        }
        self.storage.del(&sequence_key(cursor.oldest))?;
        let next = cursor.oldest + 1;
        self.storage.put(OLDEST_KEY, &sequence_key(next))?;
        cursor.oldest = next;
        Ok(())
    }
}

impl Queue for SequencedQueue {
    fn put(&self, data: &[u8]) -> Result<()> {
        let mut cursor = self.cursor.write();
        let next = cursor
            .latest
            .checked_add(1)
            .ok_or_else(|| Error::backend("queue sequence space exhausted"))?;
        let key = sequence_key(next);
        self.storage.put(&key, data)?;
        self.storage.put(LATEST_KEY, &key)?;
        cursor.latest = next;
        Ok(())
    }

    fn peek(&self) -> Result<Vec<u8>> {
        let cursor = self.cursor.read();
        self.peek_at(*cursor)
    }

    fn discard(&self) -> Result<()> {
        let mut cursor = self.cursor.write();
        self.discard_at(&mut cursor)
    }

    fn get(&self) -> Result<Vec<u8>> {
        let mut cursor = self.cursor.write();
        let data = self.peek_at(*cursor)?;
        self.discard_at(&mut cursor)?;
        Ok(data)
    }
}

/// Iterator over queued items, see [`SequencedQueue::iter`]
pub struct QueueIter {
    storage: Arc<dyn Storage>,
    next: u64,
    last: u64,
}

impl Iterator for QueueIter {
    type Item = Result<(u64, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == 0 || self.next > self.last {
            return None;
        }
        let sequence = self.next;
        // 0 marks the end
        self.next = sequence.checked_add(1).unwrap_or(0);
        match self.storage.get(&sequence_key(sequence)) {
            Ok(data) => Some(Ok((sequence, data))),
            Err(e) if e.is_not_found() => {
                self.next = 0;
                None
            }
            Err(e) => {
                self.next = 0;
                Some(Err(e))
            }
        }
    }
}
