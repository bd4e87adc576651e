//! Redundant storage
//!
//! Values are written to every backing store through the write strategy and
//! read through the read strategy. Deletes and closes fan out to every store
//! and report all failures. Key enumeration walks each store in order and
//! relies on the dedup to emit a key seen in several stores only once.

use crate::strategy::{AtLeast, FirstSuccess, ReadStrategy, WriteStrategy};
use kvmesh_common::{Error, Result};
use kvmesh_dedup::Dedup;
use kvmesh_storage::Storage;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Storage replicated over a fixed list of backing stores
pub struct RedundantStorage {
    backs: Vec<Arc<dyn Storage>>,
    write: Box<dyn WriteStrategy>,
    read: Box<dyn ReadStrategy>,
    dedup: Box<dyn Dedup>,
    /// Serializes key iterations, the dedup state belongs to one of them
    iteration: Mutex<()>,
}

impl RedundantStorage {
    pub fn new<W, R, D>(backs: Vec<Arc<dyn Storage>>, write: W, read: R, dedup: D) -> Result<Self>
    where
        W: WriteStrategy + 'static,
        R: ReadStrategy + 'static,
        D: Dedup + 'static,
    {
        if backs.is_empty() {
            return Err(Error::configuration(
                "redundant storage requires at least one backing storage",
            ));
        }
        debug!("Creating redundant storage over {} storages", backs.len());
        Ok(Self {
            backs,
            write: Box::new(write),
            read: Box::new(read),
            dedup: Box::new(dedup),
            iteration: Mutex::new(()),
        })
    }

    /// Every store must accept a write, reads take the first hit
    pub fn all<D: Dedup + 'static>(backs: Vec<Arc<dyn Storage>>, dedup: D) -> Result<Self> {
        let write = AtLeast::all(backs.len())?;
        Self::new(backs, write, FirstSuccess, dedup)
    }

    /// One store accepting a write is enough, reads take the first hit
    pub fn any<D: Dedup + 'static>(backs: Vec<Arc<dyn Storage>>, dedup: D) -> Result<Self> {
        Self::new(backs, AtLeast::any(), FirstSuccess, dedup)
    }

    #[must_use]
    pub fn backs(&self) -> &[Arc<dyn Storage>] {
        &self.backs
    }

    fn fan_out(&self, op: &str, apply: impl Fn(&dyn Storage) -> Result<()>) -> Result<()> {
        let errors = self
            .backs
            .iter()
            .enumerate()
            .filter_map(|(index, back)| {
                apply(back.as_ref())
                    .err()
                    .map(|e| e.context(format!("{op} on storage {index}")))
            })
            .collect();
        Error::aggregate_result(errors)
    }
}

impl Storage for RedundantStorage {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write.write(key, value, &self.backs)
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.read.read(key, &self.backs)
    }

    fn del(&self, key: &[u8]) -> Result<()> {
        self.fan_out("delete", |back| back.del(key))
    }

    fn keys(&self, visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
        let _iteration = self.iteration.lock();

        let mut errors = Vec::new();
        let mut stopped = None;
        for (index, back) in self.backs.iter().enumerate() {
            let mut halted = false;
            let result = back.keys(&mut |key| {
                let fresh = self.dedup.is_duplicated(key).and_then(|duplicated| {
                    if duplicated {
                        Ok(false)
                    } else {
                        self.dedup.save(key).map(|()| true)
                    }
                });
                let outcome = match fresh {
                    Ok(true) => visit(key),
                    Ok(false) => Ok(()),
                    Err(e) => Err(e),
                };
                halted = outcome.is_err();
                outcome
            });
            match result {
                Err(e) if halted => {
                    stopped = Some(e);
                    break;
                }
                Err(e) => errors.push(e.context(format!("keys of storage {index}"))),
                Ok(()) => {}
            }
        }

        // the dedup state is scoped to this iteration
        if let Err(e) = self.dedup.clear() {
            errors.push(e.context("clear iteration dedup"));
        }
        self.dedup.reset();

        if let Some(e) = stopped {
            return Err(e);
        }
        Error::aggregate_result(errors)
    }

    fn close(&self) -> Result<()> {
        self.fan_out("close", |back| back.close())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvmesh_dedup::{NaiveDedup, OffloadedDedup};
    use kvmesh_storage::{MemoryStorage, all_keys_string};
    use std::collections::HashMap;

    /// Storage rejecting writes and enumeration, reads pass through
    #[derive(Default)]
    struct Degraded(MemoryStorage);

    impl Storage for Degraded {
        fn put(&self, _key: &[u8], _value: &[u8]) -> Result<()> {
            Err(Error::backend("degraded"))
        }

        fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
            self.0.get(key)
        }

        fn del(&self, _key: &[u8]) -> Result<()> {
            Err(Error::backend("degraded"))
        }

        fn keys(&self, _visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
            Err(Error::backend("degraded"))
        }

        fn close(&self) -> Result<()> {
            Err(Error::backend("degraded"))
        }
    }

    fn offloaded() -> OffloadedDedup {
        OffloadedDedup::new(Arc::new(MemoryStorage::new()))
    }

    fn overlapping_replicas() -> Vec<Arc<MemoryStorage>> {
        let replicas: Vec<Arc<MemoryStorage>> =
            (0..3).map(|_| Arc::new(MemoryStorage::new())).collect();
        for key in ["a", "b", "c"] {
            replicas[0].put(key.as_bytes(), b"").unwrap();
        }
        for key in ["b", "c", "d"] {
            replicas[1].put(key.as_bytes(), b"").unwrap();
        }
        for key in ["a", "e"] {
            replicas[2].put(key.as_bytes(), b"").unwrap();
        }
        replicas
    }

    fn as_backs(replicas: &[Arc<MemoryStorage>]) -> Vec<Arc<dyn Storage>> {
        replicas
            .iter()
            .map(|r| r.clone() as Arc<dyn Storage>)
            .collect()
    }

    #[test]
    fn test_empty_backs_rejected() {
        let err = RedundantStorage::any(Vec::new(), offloaded()).err().unwrap();
        assert!(err.is_configuration());
        let err = RedundantStorage::all(Vec::new(), offloaded()).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_single_write_threshold_over_failing_stores() {
        // even stores reject writes but still serve reads
        let backs: Vec<Arc<dyn Storage>> = (0..5)
            .map(|i| {
                if i % 2 == 0 {
                    Arc::new(Degraded::default()) as Arc<dyn Storage>
                } else {
                    Arc::new(MemoryStorage::new())
                }
            })
            .collect();
        let storage =
            RedundantStorage::new(backs, AtLeast::new(1).unwrap(), FirstSuccess, offloaded())
                .unwrap();

        storage.put(b"key", b"value").unwrap();
        assert_eq!(storage.get(b"key").unwrap(), b"value");
        assert!(storage.get(b"other").unwrap_err().is_not_found());
    }

    #[test]
    fn test_all_requires_every_store() {
        let backs: Vec<Arc<dyn Storage>> =
            vec![Arc::new(MemoryStorage::new()), Arc::new(Degraded::default())];
        let storage = RedundantStorage::all(backs, offloaded()).unwrap();
        let err = storage.put(b"k", b"v").unwrap_err();
        assert!(err.to_string().contains("degraded"));

        // the healthy replica still took the write
        assert_eq!(storage.get(b"k").unwrap(), b"v");
    }

    #[test]
    fn test_del_and_close_fan_out() {
        let healthy = Arc::new(MemoryStorage::new());
        let backs: Vec<Arc<dyn Storage>> = vec![
            Arc::new(Degraded::default()),
            healthy.clone(),
            Arc::new(Degraded::default()),
        ];
        let storage = RedundantStorage::any(backs, offloaded()).unwrap();
        storage.put(b"k", b"v").unwrap();

        let err = storage.del(b"k").unwrap_err();
        assert_eq!(err.failure_count(), 2);
        assert!(healthy.get(b"k").unwrap_err().is_not_found());

        assert_eq!(storage.close().unwrap_err().failure_count(), 2);
    }

    #[test]
    fn test_keys_emit_each_key_once() {
        let replicas = overlapping_replicas();
        let storage = RedundantStorage::all(as_backs(&replicas), offloaded()).unwrap();

        let mut counts: HashMap<String, usize> = HashMap::new();
        storage
            .keys(&mut |key| {
                *counts
                    .entry(String::from_utf8_lossy(key).into_owned())
                    .or_default() += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(counts.len(), 5);
        assert!(counts.values().all(|&n| n == 1));
    }

    #[test]
    fn test_keys_repeat_across_iterations() {
        let replicas = overlapping_replicas();
        let offload = Arc::new(MemoryStorage::new());
        let dedup = OffloadedDedup::new(offload.clone());
        let storage = RedundantStorage::all(as_backs(&replicas), dedup).unwrap();

        for _ in 0..3 {
            let mut keys = all_keys_string(&storage).unwrap();
            keys.sort();
            assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
        }
        // the offload storage was cleared after the last iteration
        assert!(offload.is_empty());
    }

    #[test]
    fn test_keys_with_naive_dedup() {
        let replicas = overlapping_replicas();
        let dedup = NaiveDedup::new(Arc::new(MemoryStorage::new()), 100, 2).unwrap();
        let storage = RedundantStorage::all(as_backs(&replicas), dedup).unwrap();

        assert_eq!(all_keys_string(&storage).unwrap().len(), 5);
    }

    #[test]
    fn test_keys_continue_past_failing_store() {
        let replicas = overlapping_replicas();
        let mut backs = as_backs(&replicas);
        backs.insert(1, Arc::new(Degraded::default()));
        let storage = RedundantStorage::any(backs, offloaded()).unwrap();

        let mut seen = Vec::new();
        let err = storage
            .keys(&mut |key| {
                seen.push(key.to_vec());
                Ok(())
            })
            .unwrap_err();
        assert!(err.to_string().contains("degraded"));
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_keys_stop_on_visitor_error() {
        let replicas = overlapping_replicas();
        let storage = RedundantStorage::all(as_backs(&replicas), offloaded()).unwrap();

        let mut seen = 0;
        let err = storage
            .keys(&mut |_| {
                seen += 1;
                if seen == 2 {
                    return Err(Error::backend("visitor gave up"));
                }
                Ok(())
            })
            .unwrap_err();
        assert_eq!(seen, 2);
        assert_eq!(err.to_string(), "backend error: visitor gave up");

        // the next iteration starts from scratch
        assert_eq!(all_keys_string(&storage).unwrap().len(), 5);
    }

    #[test]
    fn test_concurrent_iterations_are_serialized() {
        let replicas = overlapping_replicas();
        let storage = RedundantStorage::all(as_backs(&replicas), offloaded()).unwrap();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| all_keys_string(&storage).unwrap().len()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), 5);
            }
        });
    }
}
