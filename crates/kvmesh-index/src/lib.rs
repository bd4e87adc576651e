//! kvmesh Index - secondary keys over a dedicated storage
//!
//! The index storage maps a secondary key (like an email) to the primary
//! key(s) of the records it belongs to:
//! - [`UniqueIndex`]: one primary key per secondary key, later links win
//! - [`MultiIndex`]: a list of primary keys per secondary key

pub mod multi;
pub mod unique;

pub use multi::MultiIndex;
pub use unique::UniqueIndex;

use kvmesh_common::Result;

/// Secondary key index
pub trait Index: Send + Sync {
    /// Link `secondary` to `primary`
    fn link(&self, primary: &[u8], secondary: &[u8]) -> Result<()>;

    /// Remove the link between `secondary` and `primary`
    fn unlink(&self, primary: &[u8], secondary: &[u8]) -> Result<()>;

    /// Primary keys linked to `secondary`
    fn find(&self, secondary: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// Visit every `(primary, secondary)` pair. Order follows the storage.
    fn iterate(&self, visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>) -> Result<()>;
}
