//! No-operation storage: drops every write and finds nothing.
//! Useful for mocking and for discarding a stream of keys.

use crate::storage::Storage;
use kvmesh_common::{Error, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct NopStorage;

impl NopStorage {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Storage for NopStorage {
    fn put(&self, _key: &[u8], _value: &[u8]) -> Result<()> {
        Ok(())
    }

    fn get(&self, _key: &[u8]) -> Result<Vec<u8>> {
        Err(Error::NotFound)
    }

    fn del(&self, _key: &[u8]) -> Result<()> {
        Ok(())
    }

    fn keys(&self, _visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
        Ok(())
    }
}
