//! Storage implementations for the gateway collaborators

pub mod in_memory;

pub use in_memory::{InMemoryIdentityProvider, InMemoryPermissionSource, InMemoryRecordStore};
