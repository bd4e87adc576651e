//! Multi-value index
//!
//! Each secondary key holds the JSON-encoded list of its primary keys. Lists
//! are rewritten whole on every change, so secondary keys shared by very many
//! records make links expensive.

use crate::Index;
use kvmesh_common::{Error, Result};
use kvmesh_storage::Storage;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Index allowing many primary keys per secondary key.
///
/// Link and unlink are serialized per instance. A visitor passed to
/// [`Index::iterate`] must not modify the same index.
pub struct MultiIndex {
    index: Arc<dyn Storage>,
    lock: RwLock<()>,
}

impl MultiIndex {
    #[must_use]
    pub fn new(index: Arc<dyn Storage>) -> Self {
        Self {
            index,
            lock: RwLock::new(()),
        }
    }

    fn load(&self, secondary: &[u8]) -> Result<Vec<Vec<u8>>> {
        match self.index.get(secondary) {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                Error::Deserialization(format!(
                    "primary keys of '{}': {e}",
                    String::from_utf8_lossy(secondary)
                ))
            }),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn store(&self, secondary: &[u8], primaries: &[Vec<u8>]) -> Result<()> {
        if primaries.is_empty() {
            return self.index.del(secondary);
        }
        let raw = serde_json::to_vec(primaries).map_err(|e| Error::Serialization(e.to_string()))?;
        self.index.put(secondary, &raw)
    }
}

impl Index for MultiIndex {
    /// Linking an existing pair again changes nothing
    fn link(&self, primary: &[u8], secondary: &[u8]) -> Result<()> {
        let _guard = self.lock.write();
        let mut primaries = self.load(secondary)?;
        if primaries.iter().any(|key| key == primary) {
            return Ok(());
        }
        primaries.push(primary.to_vec());
        self.store(secondary, &primaries)
    }

    /// The secondary key is dropped with its last primary key
    fn unlink(&self, primary: &[u8], secondary: &[u8]) -> Result<()> {
        let _guard = self.lock.write();
        let mut primaries = self.load(secondary)?;
        let before = primaries.len();
        primaries.retain(|key| key != primary);
        if primaries.len() == before {
            return Ok(());
        }
        debug!(
            "Unlinked '{}', {} primary keys left",
            String::from_utf8_lossy(secondary),
            primaries.len()
        );
        self.store(secondary, &primaries)
    }

    /// Empty when nothing is linked
    fn find(&self, secondary: &[u8]) -> Result<Vec<Vec<u8>>> {
        let _guard = self.lock.read();
        self.load(secondary)
    }

    fn iterate(&self, visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>) -> Result<()> {
        let _guard = self.lock.read();
        self.index.keys(&mut |secondary: &[u8]| {
            for primary in self.load(secondary)? {
                visit(&primary, secondary)?;
            }
            Ok(())
        })
    }
}
