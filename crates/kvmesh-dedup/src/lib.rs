//! kvmesh Dedup - duplicate key detection
//!
//! Two strategies:
//! - [`NaiveDedup`]: persistent set of seen keys, trimmed oldest-first once it
//!   grows past `max_keys * clean_factor`
//! - [`OffloadedDedup`]: keys tagged with a random per-iteration token; a key
//!   is a duplicate only if it carries the current token

pub mod naive;
pub mod offloaded;

pub use naive::NaiveDedup;
pub use offloaded::OffloadedDedup;

use kvmesh_common::Result;

/// Deduplication primitive: check if a key was already saved, and save it
pub trait Dedup: Send + Sync {
    /// Is the key already saved?
    fn is_duplicated(&self, key: &[u8]) -> Result<bool>;

    /// Save the key for future checks
    fn save(&self, key: &[u8]) -> Result<()>;

    /// Drop saved state if the implementation supports it. No-op by default.
    fn clear(&self) -> Result<()> {
        Ok(())
    }

    /// Start a new logical epoch. No-op by default.
    fn reset(&self) {}
}
