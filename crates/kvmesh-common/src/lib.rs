//! kvmesh Common - Shared types and utilities
//!
//! This crate provides the error taxonomy, toolkit configuration and the
//! shard routing hash functions used across all kvmesh components.

pub mod config;
pub mod error;
pub mod hash;

pub use config::Config;
pub use error::{Error, Result};
pub use hash::ShardHasher;
