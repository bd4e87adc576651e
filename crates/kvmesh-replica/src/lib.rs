//! kvmesh Replica - redundant storage over several backing stores
//!
//! [`RedundantStorage`] writes every value to all backing stores and
//! succeeds once a [`WriteStrategy`] is satisfied. Reads go through a
//! [`ReadStrategy`]. Key enumeration merges every store and emits each key
//! once per iteration with the help of a [`Dedup`](kvmesh_dedup::Dedup).

pub mod redundant;
pub mod strategy;

pub use redundant::RedundantStorage;
pub use strategy::{AtLeast, FirstSuccess, ReadStrategy, WriteStrategy};
