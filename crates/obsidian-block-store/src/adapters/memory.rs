//! In-memory ordered key-value adapter.
//!
//! An ordered map behind a reader-writer lock. Cloning produces a fresh
//! handle to the same underlying database, the way a disk engine hands out
//! handles to one store; tests reopen on a clone to exercise restart
//! paths. `close` invalidates only the handle it is called on.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::ports::{KeyValueStore, KvError, WriteBatch};

/// In-memory ordered key-value store.
#[derive(Default)]
pub struct MemoryKv {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    closed: AtomicBool,
}

impl Clone for MemoryKv {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            closed: AtomicBool::new(false),
        }
    }
}

impl MemoryKv {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True when no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_open(&self) -> Result<(), KvError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(KvError::Closed);
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryKv {
    type Batch = MemoryBatch;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        self.check_open()?;
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.check_open()?;
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn set_sync(&self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        // Memory writes are as durable as they get.
        self.set(key, value)
    }

    fn new_batch(&self) -> MemoryBatch {
        MemoryBatch {
            store: self.clone(),
            ops: Vec::new(),
        }
    }

    fn close(&self) -> Result<(), KvError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

enum BatchOp {
    Set { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Buffered writes against a [`MemoryKv`].
pub struct MemoryBatch {
    store: MemoryKv,
    ops: Vec<BatchOp>,
}

impl WriteBatch for MemoryBatch {
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Set { key, value });
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete { key });
    }

    fn write(self) -> Result<(), KvError> {
        self.store.check_open()?;
        let mut data = self.store.data.write();
        for op in self.ops {
            match op {
                BatchOp::Set { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn write_sync(self) -> Result<(), KvError> {
        self.write()
    }
}
