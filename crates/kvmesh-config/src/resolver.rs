//! Storage graph resolver

use crate::record::{KINDS, Record, RedundantRecord, ShardedRecord};
use kvmesh_common::{Config, Error, Result, ShardHasher};
use kvmesh_dedup::OffloadedDedup;
use kvmesh_replica::{AtLeast, FirstSuccess, RedundantStorage};
use kvmesh_shard::{ArrayShardPool, ShardedStorage};
use kvmesh_storage::{BackendRegistry, MemoryStorage, Storage};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Decodes a stored record into a generic document
pub type DecoderFn = Arc<dyn Fn(&[u8]) -> Result<Value> + Send + Sync>;

/// Default record decoder: JSON
pub fn json_decoder(raw: &[u8]) -> Result<Value> {
    serde_json::from_slice(raw).map_err(|e| Error::Deserialization(e.to_string()))
}

/// Builds storage graphs from records kept in a bootstrap storage
pub struct Resolver {
    registry: Arc<BackendRegistry>,
    decoder: DecoderFn,
    hasher: ShardHasher,
    entry: String,
}

impl Resolver {
    #[must_use]
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self::from_config(registry, &Config::default())
    }

    /// Resolver taking its shard hash and entry identifier from configuration
    #[must_use]
    pub fn from_config(registry: Arc<BackendRegistry>, config: &Config) -> Self {
        Self {
            registry,
            decoder: Arc::new(json_decoder),
            hasher: config.shard.hasher,
            entry: config.resolver.entry.clone(),
        }
    }

    /// Replace the record decoder
    #[must_use]
    pub fn with_decoder<F>(mut self, decoder: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Value> + Send + Sync + 'static,
    {
        self.decoder = Arc::new(decoder);
        self
    }

    #[must_use]
    pub const fn with_hasher(mut self, hasher: ShardHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Identifier resolved by [`Resolver::resolve_entry`]
    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Build the storage described by record `entry`
    pub fn resolve(&self, entry: &[u8], bootstrap: &dyn Storage) -> Result<Arc<dyn Storage>> {
        Build::new(self, bootstrap).node(entry)
    }

    /// Build the storage described by the configured entry record
    pub fn resolve_entry(&self, bootstrap: &dyn Storage) -> Result<Arc<dyn Storage>> {
        self.resolve(self.entry.as_bytes(), bootstrap)
    }

    /// Build several entries sharing one graph: a record referenced from
    /// more than one entry yields the same live storage
    pub fn resolve_many(
        &self,
        entries: &[&[u8]],
        bootstrap: &dyn Storage,
    ) -> Result<Vec<Arc<dyn Storage>>> {
        let mut build = Build::new(self, bootstrap);
        entries.iter().map(|entry| build.node(entry)).collect()
    }

    fn decode(&self, raw: &[u8]) -> Result<Record> {
        let document = (self.decoder)(raw)?;
        let kind = document
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !KINDS.contains(&kind) {
            return Err(Error::configuration(format!("unknown storage kind '{kind}'")));
        }
        serde_json::from_value(document).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.registry)
            .field("hasher", &self.hasher)
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

/// State of one resolution
struct Build<'a> {
    resolver: &'a Resolver,
    bootstrap: &'a dyn Storage,
    built: HashMap<Vec<u8>, Arc<dyn Storage>>,
    in_progress: HashSet<Vec<u8>>,
}

impl<'a> Build<'a> {
    fn new(resolver: &'a Resolver, bootstrap: &'a dyn Storage) -> Self {
        Self {
            resolver,
            bootstrap,
            built: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    fn node(&mut self, id: &[u8]) -> Result<Arc<dyn Storage>> {
        if let Some(storage) = self.built.get(id) {
            return Ok(storage.clone());
        }
        let name = String::from_utf8_lossy(id).into_owned();
        if !self.in_progress.insert(id.to_vec()) {
            return Err(Error::CycleDetected(name));
        }
        let result = self.build(id, &name);
        self.in_progress.remove(id);

        let storage = result?;
        self.built.insert(id.to_vec(), storage.clone());
        Ok(storage)
    }

    fn build(&mut self, id: &[u8], name: &str) -> Result<Arc<dyn Storage>> {
        let raw = self
            .bootstrap
            .get(id)
            .map_err(|e| e.context(format!("load record '{name}'")))?;
        let record = self
            .resolver
            .decode(&raw)
            .map_err(|e| e.context(format!("decode record '{name}'")))?;
        debug!("Building {} storage '{}'", record.kind(), name);

        match record {
            Record::Simple(simple) => self
                .resolver
                .registry
                .create(&simple.url)
                .map_err(|e| e.context(format!("create storage '{name}'"))),
            Record::Sharded(sharded) => self.sharded(&sharded),
            Record::Redundant(redundant) => self.redundant(&redundant, name),
        }
    }

    fn nodes(&mut self, ids: &[String], role: &str) -> Result<Vec<Arc<dyn Storage>>> {
        ids.iter()
            .map(|id| {
                self.node(id.as_bytes())
                    .map_err(|e| e.context(format!("get {role} '{id}'")))
            })
            .collect()
    }

    fn sharded(&mut self, record: &ShardedRecord) -> Result<Arc<dyn Storage>> {
        let shards = self.nodes(&record.shards, "shard")?;
        let pool = ArrayShardPool::with_hasher(shards, self.resolver.hasher)?;
        Ok(Arc::new(ShardedStorage::new(pool)))
    }

    fn redundant(&mut self, record: &RedundantRecord, name: &str) -> Result<Arc<dyn Storage>> {
        let backs = self.nodes(&record.storages, "backed storage")?;

        let dedup_storage: Arc<dyn Storage> = match record.dedup.as_deref() {
            Some(id) if !id.is_empty() => self
                .node(id.as_bytes())
                .map_err(|e| e.context(format!("get deduplication storage '{id}'")))?,
            _ => Arc::new(MemoryStorage::new()),
        };

        let write = match &record.write.atleast {
            Some(atleast) if atleast.num > backs.len() => {
                return Err(Error::configuration(format!(
                    "'{name}' requires {} writes but has {} storages",
                    atleast.num,
                    backs.len()
                )));
            }
            Some(atleast) => AtLeast::new(atleast.num)?,
            None => AtLeast::all(backs.len())?,
        };

        let storage =
            RedundantStorage::new(backs, write, FirstSuccess, OffloadedDedup::new(dedup_storage))?;
        Ok(Arc::new(storage))
    }
}
