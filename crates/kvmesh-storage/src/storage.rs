//! Storage contract
//!
//! Keys and values are arbitrary byte strings. `put` overwrites, `get` of an
//! absent key fails with [`kvmesh_common::Error::NotFound`], `del` of an absent key
//! succeeds. Implementations must be safe to share between threads.

use kvmesh_common::Result;
use std::sync::Arc;

/// Thread-safe key/value storage with key iteration
pub trait Storage: Send + Sync {
    /// Put single item. If it already exists it is overwritten.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Get item. If it does not exist fails with `Error::NotFound`.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    /// Delete key and value
    fn del(&self, key: &[u8]) -> Result<()>;

    /// Visit every key in implementation-defined order.
    ///
    /// Stops at the first visitor error and returns it.
    fn keys(&self, visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()>;

    /// Release resources held by the storage
    fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Probe for the clearing capability
    fn as_clearable(&self) -> Option<&dyn Clearable> {
        None
    }

    /// Probe for the namespacing capability
    fn as_namespaced(&self) -> Option<&dyn Namespaced> {
        None
    }
}

/// Storage that can wipe all of its entries at once
pub trait Clearable {
    fn clear(&self) -> Result<()>;
}

/// Storage with nested, named sub-storages.
///
/// Namespaces and regular values may share one key space.
pub trait Namespaced {
    /// Get or create a nested storage
    fn namespace(&self, name: &[u8]) -> Result<Arc<dyn Storage>>;

    /// Visit the names of all direct namespaces
    fn namespaces(&self, visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()>;

    /// Delete a nested namespace. Result is undefined if it is still in use.
    fn del_namespace(&self, name: &[u8]) -> Result<()>;
}

impl<T: Storage + ?Sized> Storage for Arc<T> {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        (**self).get(key)
    }

    fn del(&self, key: &[u8]) -> Result<()> {
        (**self).del(key)
    }

    fn keys(&self, visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
        (**self).keys(visit)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn as_clearable(&self) -> Option<&dyn Clearable> {
        (**self).as_clearable()
    }

    fn as_namespaced(&self) -> Option<&dyn Namespaced> {
        (**self).as_namespaced()
    }
}

/// Collect all keys as-is
pub fn all_keys(storage: &dyn Storage) -> Result<Vec<Vec<u8>>> {
    let mut keys = Vec::new();
    storage.keys(&mut |key| {
        keys.push(key.to_vec());
        Ok(())
    })?;
    Ok(keys)
}

/// Collect all keys, lossily converted to strings
pub fn all_keys_string(storage: &dyn Storage) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    storage.keys(&mut |key| {
        keys.push(String::from_utf8_lossy(key).into_owned());
        Ok(())
    })?;
    Ok(keys)
}

/// Collect the names of all direct namespaces
pub fn all_namespaces(storage: &dyn Namespaced) -> Result<Vec<Vec<u8>>> {
    let mut names = Vec::new();
    storage.namespaces(&mut |name| {
        names.push(name.to_vec());
        Ok(())
    })?;
    Ok(names)
}

/// Check whether a key exists, keeping every error except `NotFound`
pub fn contains(storage: &dyn Storage, key: &[u8]) -> Result<bool> {
    match storage.get(key) {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}
