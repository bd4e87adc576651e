//! Shard routing hash functions
//!
//! Routing must be a pure function of the key, so every hasher here is
//! unseeded and stable across processes and releases.

use serde::{Deserialize, Serialize};

/// Key hash used to pick a shard
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardHasher {
    /// CRC-32C (Castagnoli)
    #[default]
    Crc32c,
    /// xxHash64 folded to 32 bits
    Xxh64,
}

impl ShardHasher {
    /// Get the hasher name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Crc32c => "crc32c",
            Self::Xxh64 => "xxh64",
        }
    }

    /// Hash a key, non-scaled
    #[must_use]
    pub fn hash(&self, key: &[u8]) -> u32 {
        match self {
            Self::Crc32c => crc32c::crc32c(key),
            Self::Xxh64 => {
                let h = xxhash_rust::xxh64::xxh64(key, 0);
                #[allow(clippy::cast_possible_truncation)]
                let folded = (h ^ (h >> 32)) as u32;
                folded
            }
        }
    }
}

impl std::fmt::Display for ShardHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ShardHasher {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "crc32c" | "crc32" | "" => Ok(Self::Crc32c),
            "xxh64" | "xxhash" | "xxhash64" => Ok(Self::Xxh64),
            _ => Err(format!("unknown shard hasher: {s}")),
        }
    }
}
