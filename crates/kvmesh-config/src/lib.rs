//! kvmesh Config - build storage graphs from declarative records
//!
//! Records live in a bootstrap storage, one JSON document per identifier:
//!
//! ```text
//! { "kind": "simple",    "url": "memory://" }
//! { "kind": "sharded",   "shards": ["shard1", "shard2"] }
//! { "kind": "redundant", "read": {"first": {}}, "write": {"atleast": {"num": 1}},
//!   "dedup": "offload", "storages": ["data1", "data2"] }
//! ```
//!
//! The [`Resolver`] starts from an entry identifier and builds every
//! referenced node once, so records referenced from several places share
//! one live storage.

pub mod record;
pub mod resolver;

pub use record::{
    AtLeastRecord, FirstRecord, ReadRecord, Record, RedundantRecord, ShardedRecord, SimpleRecord,
    WriteRecord,
};
pub use resolver::{DecoderFn, Resolver, json_decoder};
