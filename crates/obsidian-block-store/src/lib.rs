//! # Block Store
//!
//! The Block Store is the authoritative persistence layer for consensus
//! blocks and their commit evidence. It sits between the consensus engine
//! (which produces blocks and commits) and an ordered key-value engine
//! (which stores bytes).
//!
//! ## Responsibilities
//!
//! - Maintain the contiguous range invariant `[base, height]` under
//!   concurrent reads: every height in the range is retrievable.
//! - Persist blocks as chunked part sets so readers can rematerialize them,
//!   and index them by height and by hash.
//! - Store the same precommit aggregate under two roles: the canonical
//!   commit of a block (keyed at the previous height) and the locally
//!   observed seen commit (keyed at the block's own height).
//! - Prune aggressively while retaining header/commit material inside the
//!   evidence window.
//!
//! ## Crate Structure
//!
//! - `keys` - Order-preserving key codec over the flat KV namespace
//! - `state` - The persisted `[base, height]` summary record
//! - `codec` - Binary serialization adapter for stored entities
//! - `ports` - Outbound port for the ordered KV engine
//! - `adapters` - In-memory KV adapter (tests, light deployments)
//! - `store` - The block store engine
//! - `metrics` - Per-operation latency histogram shim
//!
//! ## Usage
//!
//! ```ignore
//! use obsidian_block_store::{adapters::MemoryKv, BlockStore};
//!
//! let store = BlockStore::new(MemoryKv::new());
//! store.save_block(&block, &parts, &seen_commit);
//! let (block, _meta) = store.load_block(store.height()).unwrap();
//! ```

pub mod adapters;
pub mod codec;
pub mod errors;
pub mod keys;
pub mod metrics;
pub mod ports;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export key types for convenience
pub use errors::StoreError;
pub use metrics::Metrics;
pub use ports::{KeyValueStore, KvError, WriteBatch};
pub use state::BlockStoreState;
pub use store::BlockStore;
