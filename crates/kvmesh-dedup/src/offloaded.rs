//! Offloaded deduplication
//!
//! Every saved key is stored with the current iteration token. Rotating the
//! token with [`Dedup::reset`] makes all keys fresh again without touching
//! the storage; clearing the storage (when it supports it) keeps it from
//! growing across iterations.

use crate::Dedup;
use kvmesh_common::Result;
use kvmesh_storage::Storage;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Iteration-scoped deduplication over an offload storage.
///
/// The check-then-save pair is not atomic; callers needing exactly-once
/// delivery must serialize iterations themselves.
pub struct OffloadedDedup {
    storage: Arc<dyn Storage>,
    token: AtomicU64,
}

impl OffloadedDedup {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            token: AtomicU64::new(rand::random()),
        }
    }

    /// Current iteration token as stored next to each key
    #[must_use]
    pub fn token(&self) -> [u8; 8] {
        self.token.load(Ordering::Acquire).to_be_bytes()
    }
}

impl Dedup for OffloadedDedup {
    fn is_duplicated(&self, key: &[u8]) -> Result<bool> {
        match self.storage.get(key) {
            Ok(stored) => Ok(stored.as_slice() == self.token().as_slice()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn save(&self, key: &[u8]) -> Result<()> {
        self.storage.put(key, &self.token())
    }

    fn clear(&self) -> Result<()> {
        match self.storage.as_clearable() {
            Some(clearable) => clearable.clear(),
            None => Ok(()),
        }
    }

    fn reset(&self) {
        let previous = self.token.load(Ordering::Acquire);
        let mut next = rand::random();
        while next == previous {
            next = rand::random();
        }
        self.token.store(next, Ordering::Release);
        debug!("Offloaded dedup rotated iteration token");
    }
}
