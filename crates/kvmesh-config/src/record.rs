//! Configuration records

use kvmesh_common::{Error, Result};
use kvmesh_storage::Storage;
use serde::{Deserialize, Deserializer, Serialize};

/// Kind names understood by the resolver
pub const KINDS: [&str; 3] = ["simple", "sharded", "redundant"];

/// One node of a storage graph, tagged by `kind`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    /// Leaf storage built from a backend URL
    Simple(SimpleRecord),
    /// Storage sharded over other records
    Sharded(ShardedRecord),
    /// Storage replicated over other records
    Redundant(RedundantRecord),
}

impl Record {
    pub fn simple(url: impl Into<String>) -> Self {
        Self::Simple(SimpleRecord { url: url.into() })
    }

    pub fn sharded<S: Into<String>>(shards: impl IntoIterator<Item = S>) -> Self {
        Self::Sharded(ShardedRecord {
            shards: shards.into_iter().map(Into::into).collect(),
        })
    }

    /// Redundant record with default strategies and dedup
    pub fn redundant<S: Into<String>>(storages: impl IntoIterator<Item = S>) -> Self {
        Self::Redundant(RedundantRecord {
            storages: storages.into_iter().map(Into::into).collect(),
            ..RedundantRecord::default()
        })
    }

    /// Kind name as stored in the `kind` field
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Simple(_) => "simple",
            Self::Sharded(_) => "sharded",
            Self::Redundant(_) => "redundant",
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Write the record to a bootstrap storage under `id`
    pub fn save(&self, bootstrap: &dyn Storage, id: &str) -> Result<()> {
        bootstrap.put(id.as_bytes(), &self.to_json()?)
    }
}

/// Absent and `null` lists both decode as empty
fn nullable_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleRecord {
    /// Backend URL, e.g. `memory://`
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardedRecord {
    /// Identifiers of the shard records, in shard order
    #[serde(default, deserialize_with = "nullable_list")]
    pub shards: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedundantRecord {
    #[serde(default)]
    pub read: ReadRecord,
    #[serde(default)]
    pub write: WriteRecord,
    /// Identifier of the storage used to deduplicate keys during iteration.
    /// An in-memory storage is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedup: Option<String>,
    /// Identifiers of the backing storage records
    #[serde(default, deserialize_with = "nullable_list")]
    pub storages: Vec<String>,
}

/// Read strategy; first-success when nothing is set
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<FirstRecord>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstRecord {}

/// Write strategy; every storage must accept the write when nothing is set
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atleast: Option<AtLeastRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtLeastRecord {
    pub num: usize,
}
