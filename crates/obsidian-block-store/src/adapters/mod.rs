//! # KV Adapters
//!
//! Implementations of the [`crate::ports::KeyValueStore`] port. The
//! in-memory adapter backs unit tests and light deployments; production
//! nodes plug in a disk engine behind the same port.

mod memory;

pub use memory::{MemoryBatch, MemoryKv};
