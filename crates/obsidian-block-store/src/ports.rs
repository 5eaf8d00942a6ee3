//! # Outbound Ports
//!
//! The interface the block store requires from the host's ordered
//! key-value engine.
//!
//! The store owns one handle for its entire lifetime and calls it from
//! multiple reader threads in parallel, so all methods take `&self`;
//! interior synchronization is the adapter's concern. Durability is part
//! of the contract: `set_sync` and `WriteBatch::write_sync` must not
//! return until the write is persistent, because the store advertises its
//! `[base, height]` range only after such a barrier.

use thiserror::Error;

/// Key-value engine errors.
#[derive(Debug, Error)]
pub enum KvError {
    /// I/O error during read/write.
    #[error("kv engine i/o error: {0}")]
    Io(String),

    /// The handle was used after `close`.
    #[error("kv engine already closed")]
    Closed,
}

/// Abstract interface for the ordered key-value engine.
pub trait KeyValueStore: Send + Sync {
    /// The batch type produced by [`KeyValueStore::new_batch`].
    type Batch: WriteBatch;

    /// Get a value by key. Absent keys yield `Ok(None)`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError>;

    /// Put a single key-value pair.
    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), KvError>;

    /// Put a single key-value pair and flush it durably before returning.
    fn set_sync(&self, key: &[u8], value: &[u8]) -> Result<(), KvError>;

    /// Start a new write batch.
    fn new_batch(&self) -> Self::Batch;

    /// Close the engine handle. Idempotent.
    fn close(&self) -> Result<(), KvError>;
}

/// A buffered group of writes applied together.
///
/// `write` and `write_sync` consume the batch, so every batch is closed on
/// every exit path; a batch that is dropped unwritten is discarded.
pub trait WriteBatch {
    /// Buffer a put.
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>);

    /// Buffer a delete.
    fn delete(&mut self, key: Vec<u8>);

    /// Apply all buffered operations.
    fn write(self) -> Result<(), KvError>;

    /// Apply all buffered operations and flush them durably.
    fn write_sync(self) -> Result<(), KvError>;
}
