//! Unique index: the secondary key is stored with the primary key as value

use crate::Index;
use kvmesh_common::Result;
use kvmesh_storage::Storage;
use std::sync::Arc;

pub struct UniqueIndex {
    index: Arc<dyn Storage>,
}

impl UniqueIndex {
    #[must_use]
    pub fn new(index: Arc<dyn Storage>) -> Self {
        Self { index }
    }
}

impl Index for UniqueIndex {
    fn link(&self, primary: &[u8], secondary: &[u8]) -> Result<()> {
        self.index.put(secondary, primary)
    }

    /// Drops the secondary key whatever primary key it holds
    fn unlink(&self, _primary: &[u8], secondary: &[u8]) -> Result<()> {
        self.index.del(secondary)
    }

    /// `NotFound` when nothing is linked
    fn find(&self, secondary: &[u8]) -> Result<Vec<Vec<u8>>> {
        Ok(vec![self.index.get(secondary)?])
    }

    fn iterate(&self, visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>) -> Result<()> {
        self.index.keys(&mut |secondary: &[u8]| {
            let primary = self.index.get(secondary)?;
            visit(&primary, secondary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvmesh_storage::MemoryStorage;

    #[test]
    fn test_link_overwrites() {
        let index = UniqueIndex::new(Arc::new(MemoryStorage::new()));
        index.link(b"user-1", b"a@example.com").unwrap();
        assert_eq!(index.find(b"a@example.com").unwrap(), vec![b"user-1".to_vec()]);

        index.link(b"user-2", b"a@example.com").unwrap();
        assert_eq!(index.find(b"a@example.com").unwrap(), vec![b"user-2".to_vec()]);
    }

    #[test]
    fn test_unlink() {
        let index = UniqueIndex::new(Arc::new(MemoryStorage::new()));
        index.link(b"user-1", b"a@example.com").unwrap();
        index.unlink(b"user-1", b"a@example.com").unwrap();
        assert!(index.find(b"a@example.com").unwrap_err().is_not_found());

        // unlinking twice is fine
        index.unlink(b"user-1", b"a@example.com").unwrap();
    }

    #[test]
    fn test_iterate_pairs() {
        let index = UniqueIndex::new(Arc::new(MemoryStorage::new()));
        index.link(b"user-1", b"a@example.com").unwrap();
        index.link(b"user-2", b"b@example.com").unwrap();

        let mut pairs = Vec::new();
        index
            .iterate(&mut |primary, secondary| {
                pairs.push((primary.to_vec(), secondary.to_vec()));
                Ok(())
            })
            .unwrap();
        assert_eq!(
            pairs,
            vec![
                (b"user-1".to_vec(), b"a@example.com".to_vec()),
                (b"user-2".to_vec(), b"b@example.com".to_vec()),
            ]
        );
    }
}
