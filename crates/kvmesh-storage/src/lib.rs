//! kvmesh Storage - the key/value contract every layer composes on
//!
//! This crate provides:
//! - The [`Storage`] trait and its optional capabilities ([`Clearable`],
//!   [`Namespaced`]) discovered through capability probing
//! - Collection helpers over the contract
//! - Two reference backends: an in-memory map and a no-op sink
//! - The [`BackendRegistry`] mapping URL schemes to backend factories

pub mod memory;
pub mod nop;
pub mod registry;
pub mod storage;

// Re-exports
pub use kvmesh_common::{Error, Result};
pub use memory::MemoryStorage;
pub use nop::NopStorage;
pub use registry::{BackendFactory, BackendRegistry};
pub use storage::{
    Clearable, Namespaced, Storage, all_keys, all_keys_string, all_namespaces, contains,
};
