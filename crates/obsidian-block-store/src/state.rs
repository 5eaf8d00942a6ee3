//! # Store State
//!
//! The persisted summary record holding the contiguous range
//! `[base, height]`. It is saved with a synchronous write after every tip
//! advance or prune, which doubles as the durability barrier for the
//! writes that preceded it: the advertised range is always a lower bound
//! on what is on disk.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::keys::STORE_STATE_KEY;
use crate::ports::{KeyValueStore, KvError};

/// The contiguous range of stored heights.
///
/// Both fields zero means the store is empty. Otherwise every height in
/// `[base, height]` is retrievable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStoreState {
    /// Lowest retained height, or 0 when empty.
    pub base: i64,
    /// Highest stored height, or 0 when empty.
    pub height: i64,
}

impl BlockStoreState {
    /// True iff no blocks are stored.
    pub fn is_empty(&self) -> bool {
        self.base == 0 && self.height == 0
    }

    /// Number of stored heights.
    pub fn size(&self) -> i64 {
        if self.height == 0 {
            0
        } else {
            self.height - self.base + 1
        }
    }
}

/// Load the persisted state, or the zero state if none was saved yet.
///
/// Records written before the `base` field existed persist `base == 0`
/// alongside a nonzero height; those are coerced to `base := 1`, which is
/// what such stores actually held.
///
/// # Panics
///
/// Panics if the persisted record cannot be decoded (on-disk corruption)
/// or the engine fails the read.
pub fn load_state<Kv: KeyValueStore>(db: &Kv) -> BlockStoreState {
    let bytes = db
        .get(STORE_STATE_KEY)
        .unwrap_or_else(|e| panic!("failed to read block store state: {e}"));
    let Some(bytes) = bytes else {
        return BlockStoreState::default();
    };
    let mut state: BlockStoreState = codec::from_bytes(&bytes)
        .unwrap_or_else(|e| panic!("failed to decode block store state: {e}"));
    if state.base == 0 && state.height > 0 {
        tracing::info!(
            height = state.height,
            "[block-store] legacy state record without base, coercing base to 1"
        );
        state.base = 1;
    }
    state
}

/// Persist the state with a synchronous write.
///
/// The sync write flushes the KV engine, establishing the durability
/// barrier the engine relies on after tip advances and prunes.
///
/// # Panics
///
/// Panics if the record cannot be encoded.
pub fn save_state<Kv: KeyValueStore>(db: &Kv, state: &BlockStoreState) -> Result<(), KvError> {
    let bytes = codec::to_bytes(state)
        .unwrap_or_else(|e| panic!("failed to encode block store state: {e}"));
    db.set_sync(STORE_STATE_KEY, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryKv;

    #[test]
    fn test_load_absent_state_is_zero() {
        let db = MemoryKv::new();
        assert_eq!(load_state(&db), BlockStoreState::default());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let db = MemoryKv::new();
        let state = BlockStoreState {
            base: 100,
            height: 5000,
        };
        save_state(&db, &state).unwrap();
        assert_eq!(load_state(&db), state);
    }

    #[test]
    fn test_legacy_record_coerces_base_to_one() {
        let db = MemoryKv::new();
        save_state(&db, &BlockStoreState { base: 0, height: 5 }).unwrap();
        assert_eq!(load_state(&db), BlockStoreState { base: 1, height: 5 });
    }

    #[test]
    fn test_empty_state_is_not_coerced() {
        let db = MemoryKv::new();
        save_state(&db, &BlockStoreState { base: 0, height: 0 }).unwrap();
        assert_eq!(load_state(&db), BlockStoreState { base: 0, height: 0 });
    }

    #[test]
    #[should_panic(expected = "failed to decode block store state")]
    fn test_corrupt_state_is_fatal() {
        let db = MemoryKv::new();
        db.set_sync(STORE_STATE_KEY, &[0xFF, 0xFE]).unwrap();
        let _ = load_state(&db);
    }

    #[test]
    fn test_size_of_empty_and_ranges() {
        assert_eq!(BlockStoreState::default().size(), 0);
        assert_eq!(BlockStoreState { base: 1, height: 1 }.size(), 1);
        assert_eq!(
            BlockStoreState {
                base: 50,
                height: 100
            }
            .size(),
            51
        );
    }
}
