//! Read and write strategies for redundant storage

use kvmesh_common::{Error, Result};
use kvmesh_storage::Storage;
use std::sync::Arc;
use tracing::warn;

/// Decide how a value is written to the backing stores
pub trait WriteStrategy: Send + Sync {
    fn write(&self, key: &[u8], value: &[u8], backs: &[Arc<dyn Storage>]) -> Result<()>;
}

/// Decide how a value is read from the backing stores
pub trait ReadStrategy: Send + Sync {
    fn read(&self, key: &[u8], backs: &[Arc<dyn Storage>]) -> Result<Vec<u8>>;
}

impl<F> WriteStrategy for F
where
    F: Fn(&[u8], &[u8], &[Arc<dyn Storage>]) -> Result<()> + Send + Sync,
{
    fn write(&self, key: &[u8], value: &[u8], backs: &[Arc<dyn Storage>]) -> Result<()> {
        self(key, value, backs)
    }
}

impl<F> ReadStrategy for F
where
    F: Fn(&[u8], &[Arc<dyn Storage>]) -> Result<Vec<u8>> + Send + Sync,
{
    fn read(&self, key: &[u8], backs: &[Arc<dyn Storage>]) -> Result<Vec<u8>> {
        self(key, backs)
    }
}

/// Write to every store, succeed if at least `min` writes succeeded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtLeast {
    min: usize,
}

impl AtLeast {
    pub fn new(min: usize) -> Result<Self> {
        if min == 0 {
            return Err(Error::configuration("write threshold must be at least 1"));
        }
        Ok(Self { min })
    }

    /// Every one of `stores` must accept the write
    pub fn all(stores: usize) -> Result<Self> {
        Self::new(stores)
    }

    /// One successful write is enough
    #[must_use]
    pub const fn any() -> Self {
        Self { min: 1 }
    }

    #[must_use]
    pub const fn min(&self) -> usize {
        self.min
    }
}

impl WriteStrategy for AtLeast {
    fn write(&self, key: &[u8], value: &[u8], backs: &[Arc<dyn Storage>]) -> Result<()> {
        let mut written = 0;
        let mut errors = Vec::new();
        for (index, back) in backs.iter().enumerate() {
            match back.put(key, value) {
                Ok(()) => written += 1,
                Err(e) => errors.push(e.context(format!("write to storage {index}"))),
            }
        }

        if written < self.min {
            return Err(Error::aggregate(errors).unwrap_or_else(|| {
                Error::backend(format!(
                    "{written} of {} writes succeeded, {} required",
                    backs.len(),
                    self.min
                ))
            }));
        }
        if !errors.is_empty() {
            let failures: Vec<String> = errors.iter().map(ToString::to_string).collect();
            warn!(
                "Write met threshold {}/{} with {} failed storages: {}",
                written,
                backs.len(),
                errors.len(),
                failures.join("; ")
            );
            metrics::counter!("kvmesh_redundant_write_failures_total")
                .increment(errors.len() as u64);
        }
        Ok(())
    }
}

/// Return the value from the first store that has it.
///
/// When every store fails, a `NotFound` from the last store is reported as
/// `NotFound`, any other outcome as the aggregated failures.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstSuccess;

impl ReadStrategy for FirstSuccess {
    fn read(&self, key: &[u8], backs: &[Arc<dyn Storage>]) -> Result<Vec<u8>> {
        let mut errors = Vec::new();
        for back in backs {
            match back.get(key) {
                Ok(value) => return Ok(value),
                Err(e) => errors.push(e),
            }
        }
        if errors.last().is_none_or(Error::is_not_found) {
            return Err(Error::NotFound);
        }
        Err(Error::aggregate(errors).unwrap_or(Error::NotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvmesh_storage::{MemoryStorage, NopStorage};

    /// Storage rejecting every write while reads go through
    #[derive(Default)]
    struct ReadOnly(MemoryStorage);

    impl Storage for ReadOnly {
        fn put(&self, _key: &[u8], _value: &[u8]) -> Result<()> {
            Err(Error::backend("read only"))
        }

        fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
            self.0.get(key).map_err(|e| e.context("read only storage"))
        }

        fn del(&self, key: &[u8]) -> Result<()> {
            self.0.del(key)
        }

        fn keys(&self, visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
            self.0.keys(visit)
        }
    }

    /// Storage failing every read with a backend error
    struct Unreachable;

    impl Storage for Unreachable {
        fn put(&self, _key: &[u8], _value: &[u8]) -> Result<()> {
            Err(Error::backend("unreachable"))
        }

        fn get(&self, _key: &[u8]) -> Result<Vec<u8>> {
            Err(Error::backend("unreachable"))
        }

        fn del(&self, _key: &[u8]) -> Result<()> {
            Err(Error::backend("unreachable"))
        }

        fn keys(&self, _visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
            Err(Error::backend("unreachable"))
        }
    }

    fn mixed_stores() -> Vec<Arc<dyn Storage>> {
        (0..5)
            .map(|i| {
                if i % 2 == 0 {
                    Arc::new(ReadOnly::default()) as Arc<dyn Storage>
                } else {
                    Arc::new(MemoryStorage::new())
                }
            })
            .collect()
    }

    #[test]
    fn test_zero_threshold_rejected() {
        assert!(AtLeast::new(0).unwrap_err().is_configuration());
        assert!(AtLeast::all(0).unwrap_err().is_configuration());
        assert_eq!(AtLeast::all(3).unwrap().min(), 3);
        assert_eq!(AtLeast::any().min(), 1);
    }

    #[test]
    fn test_threshold_met_despite_failures() {
        let backs = mixed_stores();
        AtLeast::any().write(b"k", b"v", &backs).unwrap();
        AtLeast::new(2).unwrap().write(b"k", b"v", &backs).unwrap();
        assert_eq!(FirstSuccess.read(b"k", &backs).unwrap(), b"v");
    }

    #[test]
    fn test_threshold_missed_aggregates_errors() {
        let backs = mixed_stores();
        let err = AtLeast::new(3).unwrap().write(b"k", b"v", &backs).unwrap_err();
        assert_eq!(err.failure_count(), 3);
        assert!(err.to_string().contains("read only"));
    }

    #[test]
    fn test_threshold_above_store_count() {
        let backs: Vec<Arc<dyn Storage>> = vec![Arc::new(NopStorage::new())];
        let err = AtLeast::new(2).unwrap().write(b"k", b"v", &backs).unwrap_err();
        assert_eq!(err.to_string(), "backend error: 1 of 1 writes succeeded, 2 required");
    }

    #[test]
    fn test_first_success_prefers_earliest() {
        let first = Arc::new(MemoryStorage::new());
        let second = Arc::new(MemoryStorage::new());
        first.put(b"k", b"one").unwrap();
        second.put(b"k", b"two").unwrap();
        second.put(b"only", b"two").unwrap();
        let backs: Vec<Arc<dyn Storage>> = vec![first, second];

        assert_eq!(FirstSuccess.read(b"k", &backs).unwrap(), b"one");
        assert_eq!(FirstSuccess.read(b"only", &backs).unwrap(), b"two");
    }

    #[test]
    fn test_first_success_not_found() {
        let backs: Vec<Arc<dyn Storage>> =
            vec![Arc::new(ReadOnly::default()), Arc::new(MemoryStorage::new())];
        let err = FirstSuccess.read(b"missing", &backs).unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn test_first_success_not_found_behind_unreachable() {
        let backs: Vec<Arc<dyn Storage>> =
            vec![Arc::new(Unreachable), Arc::new(MemoryStorage::new())];
        let err = FirstSuccess.read(b"missing", &backs).unwrap_err();
        assert!(matches!(err, Error::NotFound));
        assert!(matches!(FirstSuccess.read(b"k", &[]), Err(Error::NotFound)));
    }

    #[test]
    fn test_first_success_reports_last_failure() {
        let backs: Vec<Arc<dyn Storage>> =
            vec![Arc::new(MemoryStorage::new()), Arc::new(Unreachable)];
        let err = FirstSuccess.read(b"missing", &backs).unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(err.failure_count(), 2);
        assert!(err.to_string().contains("unreachable"));
    }

    #[test]
    fn test_closure_strategies() {
        let backs: Vec<Arc<dyn Storage>> = vec![Arc::new(MemoryStorage::new())];
        let last_only = |key: &[u8], value: &[u8], backs: &[Arc<dyn Storage>]| {
            backs.last().map_or(Ok(()), |back| back.put(key, value))
        };
        let fixed = |_key: &[u8], _backs: &[Arc<dyn Storage>]| -> Result<Vec<u8>> {
            Ok(b"fixed".to_vec())
        };

        last_only.write(b"k", b"v", &backs).unwrap();
        assert_eq!(backs[0].get(b"k").unwrap(), b"v");
        assert_eq!(fixed.read(b"k", &backs).unwrap(), b"fixed");
    }
}
