//! In-memory storage
//!
//! Ordered map behind a `parking_lot::RwLock`. Keys are enumerated in
//! lexicographic order from a snapshot, so a visitor may write back into the
//! same storage without deadlocking.

use crate::storage::{Clearable, Namespaced, Storage};
use kvmesh_common::{Error, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory storage with namespace and clearing support
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    namespaces: RwLock<BTreeMap<Vec<u8>, Arc<MemoryStorage>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries (namespaces excluded)
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.entries.read().get(key).cloned().ok_or(Error::NotFound)
    }

    fn del(&self, key: &[u8]) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self, visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
        let snapshot: Vec<Vec<u8>> = self.entries.read().keys().cloned().collect();
        for key in &snapshot {
            visit(key)?;
        }
        Ok(())
    }

    fn as_clearable(&self) -> Option<&dyn Clearable> {
        Some(self)
    }

    fn as_namespaced(&self) -> Option<&dyn Namespaced> {
        Some(self)
    }
}

impl Clearable for MemoryStorage {
    fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }
}

impl Namespaced for MemoryStorage {
    fn namespace(&self, name: &[u8]) -> Result<Arc<dyn Storage>> {
        if let Some(existing) = self.namespaces.read().get(name) {
            return Ok(existing.clone());
        }
        let mut namespaces = self.namespaces.write();
        let nested = namespaces
            .entry(name.to_vec())
            .or_insert_with(|| Arc::new(Self::new()))
            .clone();
        Ok(nested)
    }

    fn namespaces(&self, visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
        let names: Vec<Vec<u8>> = self.namespaces.read().keys().cloned().collect();
        for name in &names {
            visit(name)?;
        }
        Ok(())
    }

    fn del_namespace(&self, name: &[u8]) -> Result<()> {
        self.namespaces.write().remove(name);
        Ok(())
    }
}
