//! Naive deduplication
//!
//! Keeps every saved key in its own storage. Each key's marker value is the
//! 8-byte big-endian insertion sequence, so the age order survives restarts
//! and does not depend on how the backing storage enumerates keys. Entries
//! without a valid marker (written by older versions) are treated as oldest.

use crate::Dedup;
use kvmesh_common::config::DedupConfig;
use kvmesh_common::{Error, Result};
use kvmesh_storage::{Storage, contains};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Age index of saved keys
#[derive(Default)]
struct AgeIndex {
    /// (sequence, key), oldest first
    by_age: BTreeSet<(u64, Vec<u8>)>,
    sequence_of: HashMap<Vec<u8>, u64>,
    next_sequence: u64,
}

impl AgeIndex {
    fn len(&self) -> usize {
        self.sequence_of.len()
    }

    fn insert(&mut self, key: &[u8], sequence: u64) {
        if let Some(previous) = self.sequence_of.insert(key.to_vec(), sequence) {
            self.by_age.remove(&(previous, key.to_vec()));
        }
        self.by_age.insert((sequence, key.to_vec()));
    }

    fn oldest(&self) -> Option<&(u64, Vec<u8>)> {
        self.by_age.first()
    }

    fn remove(&mut self, entry: &(u64, Vec<u8>)) {
        self.by_age.remove(entry);
        self.sequence_of.remove(&entry.1);
    }
}

/// Deduplication over a persistent key set with self-cleaning.
///
/// Once `max_keys * clean_factor` keys are stored, `save` evicts the oldest
/// keys inline until `max_keys` remain.
pub struct NaiveDedup {
    storage: Arc<dyn Storage>,
    max_keys: usize,
    cleanup_amount: usize,
    index: RwLock<AgeIndex>,
}

impl NaiveDedup {
    /// Wrap a storage, indexing the keys it already holds
    pub fn new(storage: Arc<dyn Storage>, max_keys: usize, clean_factor: usize) -> Result<Self> {
        if max_keys == 0 {
            return Err(Error::configuration("naive dedup requires max_keys > 0"));
        }
        if clean_factor == 0 {
            return Err(Error::configuration("naive dedup requires clean_factor >= 1"));
        }
        let cleanup_amount = max_keys.checked_mul(clean_factor).ok_or_else(|| {
            Error::configuration(format!(
                "naive dedup threshold overflows: {max_keys} x {clean_factor}"
            ))
        })?;

        let mut existing = Vec::new();
        storage.keys(&mut |key| {
            existing.push(key.to_vec());
            Ok(())
        })?;

        let mut index = AgeIndex::default();
        let mut newest = 0;
        for key in existing {
            let sequence = match storage.get(&key) {
                Ok(marker) => decode_marker(&marker),
                // removed between enumeration and lookup
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            newest = newest.max(sequence);
            index.insert(&key, sequence);
        }
        index.next_sequence = newest + 1;
        debug!("Naive dedup loaded {} existing keys", index.len());

        Ok(Self {
            storage,
            max_keys,
            cleanup_amount,
            index: RwLock::new(index),
        })
    }

    /// Build with the thresholds from configuration
    pub fn from_config(storage: Arc<dyn Storage>, config: &DedupConfig) -> Result<Self> {
        Self::new(storage, config.max_keys, config.clean_factor)
    }

    /// Number of tracked keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn max_keys(&self) -> usize {
        self.max_keys
    }

    fn cleanup(&self, index: &mut AgeIndex) -> Result<()> {
        let amount_to_delete = index.len().saturating_sub(self.max_keys);
        let mut evicted = 0u64;
        for _ in 0..amount_to_delete {
            let Some(oldest) = index.oldest().cloned() else {
                break;
            };
            self.storage.del(&oldest.1)?;
            index.remove(&oldest);
            evicted += 1;
        }
        debug!("Naive dedup evicted {} keys, {} left", evicted, index.len());
        metrics::counter!("kvmesh_dedup_evictions_total").increment(evicted);
        Ok(())
    }
}

impl Dedup for NaiveDedup {
    fn is_duplicated(&self, key: &[u8]) -> Result<bool> {
        let _index = self.index.read();
        contains(self.storage.as_ref(), key)
    }

    fn save(&self, key: &[u8]) -> Result<()> {
        let mut index = self.index.write();
        let sequence = index.next_sequence;
        self.storage.put(key, &sequence.to_be_bytes())?;
        index.next_sequence += 1;
        index.insert(key, sequence);
        if index.len() >= self.cleanup_amount {
            self.cleanup(&mut index)?;
        }
        Ok(())
    }
}

fn decode_marker(marker: &[u8]) -> u64 {
    <[u8; 8]>::try_from(marker).map_or(0, u64::from_be_bytes)
}
