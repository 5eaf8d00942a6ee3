//! # Block Store Engine
//!
//! Manages the contiguous `[base, height]` range under a reader-writer
//! discipline, persists block metas, parts, commits, seen commits,
//! extended commits and the hash index, and prunes with evidence-aware
//! retention.
//!
//! ## Concurrency
//!
//! One reader-writer lock guards only the in-memory `[base, height]` pair;
//! the key layout does not lend itself to rederiving the range by scanning,
//! so it is the single piece of state kept outside the KV engine. Readers
//! proceed in parallel. Writers touch the lock only for the brief range
//! mutation; KV writes happen outside it.
//!
//! ## Write ordering
//!
//! Parts are written before the meta, so any reader that observes a meta
//! can assemble the block. The range record is persisted last with a sync
//! write, so the advertised range is a lower bound on what is durable.


use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use obsidian_types::{
    is_evidence_expired, Block, BlockMeta, ChainState, Commit, ExtendedCommit, Hash, Part, PartSet,
};

use crate::codec;
use crate::errors::StoreError;
use crate::keys;
use crate::metrics::Metrics;
use crate::ports::{KeyValueStore, WriteBatch};
use crate::state::{self, BlockStoreState};

/// Flush cadence for pruning batches.
const PRUNE_FLUSH_EVERY: u64 = 1000;

/// The block store engine.
///
/// Owns the KV handle and the `[base, height]` range for its lifetime.
/// Blocks handed back from reads are fresh copies with no aliasing into
/// the store.
pub struct BlockStore<KV>
where
    KV: KeyValueStore,
{
    /// Key-value engine holding all persisted entities.
    db: KV,
    /// The contiguous range of stored heights.
    range: RwLock<BlockStoreState>,
    /// Per-operation latency histogram.
    metrics: Metrics,
}

impl<KV> BlockStore<KV>
where
    KV: KeyValueStore,
{
    /// Open a store over `db` without metrics.
    ///
    /// Loads the persisted range record; a store that was never written
    /// opens empty. Corruption is not probed here and surfaces on first
    /// read.
    pub fn new(db: KV) -> Self {
        Self::with_metrics(db, Metrics::noop())
    }

    /// Open a store over `db`, timing every operation into `metrics`.
    pub fn with_metrics(db: KV, metrics: Metrics) -> Self {
        let range = state::load_state(&db);
        tracing::debug!(
            base = range.base,
            height = range.height,
            "[block-store] opened"
        );
        Self {
            db,
            range: RwLock::new(range),
            metrics,
        }
    }

    // =========================================================================
    // Range accessors
    // =========================================================================

    /// Lowest retained height, or 0 when the store is empty.
    pub fn base(&self) -> i64 {
        let _timer = self.metrics.timer("base");
        self.range.read().base
    }

    /// Highest stored height, or 0 when the store is empty.
    pub fn height(&self) -> i64 {
        let _timer = self.metrics.timer("height");
        self.range.read().height
    }

    /// Number of stored heights.
    pub fn size(&self) -> i64 {
        let _timer = self.metrics.timer("size");
        self.range.read().size()
    }

    /// True iff no blocks are stored.
    pub fn is_empty(&self) -> bool {
        let _timer = self.metrics.timer("is_empty");
        self.range.read().is_empty()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The meta of the earliest retained block, or `None` when empty.
    pub fn load_base_meta(&self) -> Option<BlockMeta> {
        let _timer = self.metrics.timer("load_base_meta");
        let base = self.range.read().base;
        if base == 0 {
            return None;
        }
        self.load_block_meta_inner(base)
    }

    /// The block meta at `height`, or `None` if absent.
    ///
    /// # Panics
    ///
    /// Panics if the stored bytes cannot be decoded.
    pub fn load_block_meta(&self, height: i64) -> Option<BlockMeta> {
        let _timer = self.metrics.timer("load_block_meta");
        self.load_block_meta_inner(height)
    }

    /// The full block at `height` together with its meta, or `None` if the
    /// meta is absent or any part has been pruned out from under it.
    ///
    /// # Panics
    ///
    /// Panics if the reassembled bytes cannot be decoded.
    pub fn load_block(&self, height: i64) -> Option<(Block, BlockMeta)> {
        let _timer = self.metrics.timer("load_block");
        self.load_block_inner(height)
    }

    /// The block with the given hash, resolved via the hash index.
    ///
    /// # Panics
    ///
    /// Panics if the index entry is unparseable or the block is corrupt.
    pub fn load_block_by_hash(&self, hash: &Hash) -> Option<(Block, BlockMeta)> {
        let _timer = self.metrics.timer("load_block_by_hash");
        let height = self.lookup_hash(hash)?;
        self.load_block_inner(height)
    }

    /// The meta of the block with the given hash.
    ///
    /// # Panics
    ///
    /// Panics if the index entry is unparseable or the meta is corrupt.
    pub fn load_block_meta_by_hash(&self, hash: &Hash) -> Option<BlockMeta> {
        let _timer = self.metrics.timer("load_block_meta_by_hash");
        let height = self.lookup_hash(hash)?;
        self.load_block_meta_inner(height)
    }

    /// Part `index` of the block at `height`, or `None` if absent.
    ///
    /// # Panics
    ///
    /// Panics if the stored bytes cannot be decoded.
    pub fn load_block_part(&self, height: i64, index: u32) -> Option<Part> {
        let _timer = self.metrics.timer("load_block_part");
        self.get_decoded(&keys::block_part_key(height, index), "block part")
    }

    /// The canonical commit stored at `height`: the `LastCommit` carried by
    /// block `height + 1` when it was saved.
    ///
    /// # Panics
    ///
    /// Panics if the stored bytes cannot be decoded.
    pub fn load_block_commit(&self, height: i64) -> Option<Commit> {
        let _timer = self.metrics.timer("load_block_commit");
        self.get_decoded(&keys::block_commit_key(height), "block commit")
    }

    /// The locally observed commit for the block at `height`.
    ///
    /// # Panics
    ///
    /// Panics if the stored bytes cannot be decoded.
    pub fn load_seen_commit(&self, height: i64) -> Option<Commit> {
        let _timer = self.metrics.timer("load_seen_commit");
        self.get_decoded(&keys::seen_commit_key(height), "seen commit")
    }

    /// The extended commit for the block at `height`, when vote extensions
    /// were enabled at save time.
    ///
    /// # Panics
    ///
    /// Panics if the stored bytes cannot be decoded.
    pub fn load_block_extended_commit(&self, height: i64) -> Option<ExtendedCommit> {
        let _timer = self.metrics.timer("load_block_extended_commit");
        self.get_decoded(&keys::extended_commit_key(height), "extended commit")
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Persist a block with its part set and seen commit, then advance the
    /// range.
    ///
    /// # Panics
    ///
    /// Panics on a non-contiguous height, an incomplete part set, a seen
    /// commit whose height does not match the block, or a failing KV
    /// write. These are caller contract violations; the store refuses to
    /// continue with a range it can no longer vouch for.
    pub fn save_block(&self, block: &Block, parts: &PartSet, seen_commit: &Commit) {
        let _timer = self.metrics.timer("save_block");
        self.save_block_entities(block, parts, seen_commit, None);
    }

    /// Persist a block along with the extended commit carrying per-vote
    /// application extensions. The plain projection of the extended commit
    /// is stored as the seen commit.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`BlockStore::save_block`], and
    /// additionally if any `Commit`-flagged vote lacks its extension
    /// signature.
    pub fn save_block_with_extended_commit(
        &self,
        block: &Block,
        parts: &PartSet,
        seen_extended_commit: &ExtendedCommit,
    ) {
        let _timer = self.metrics.timer("save_block_with_extended_commit");
        if let Err(e) = seen_extended_commit.ensure_extensions(true) {
            panic!("cannot save extended commit: {e}");
        }
        let seen_commit = seen_extended_commit.to_commit();
        self.save_block_entities(block, parts, &seen_commit, Some(seen_extended_commit));
    }

    /// Store only a seen commit at `height`, leaving the range untouched.
    ///
    /// State-sync bootstrap uses this to land the commit for a light-block
    /// before the blocks themselves are materialized.
    pub fn save_seen_commit(&self, height: i64, seen_commit: &Commit) -> Result<(), StoreError> {
        let _timer = self.metrics.timer("save_seen_commit");
        let bytes = must_encode(seen_commit, "seen commit");
        self.db.set(&keys::seen_commit_key(height), &bytes)?;
        Ok(())
    }

    /// Prune all per-height data below `target`, keeping header and commit
    /// material for heights still inside the evidence window.
    ///
    /// Returns the number of pruned heights and the evidence retain
    /// height: the lowest height whose meta and commit were kept.
    pub fn prune_blocks(
        &self,
        target: i64,
        chain_state: &ChainState,
    ) -> Result<(u64, i64), StoreError> {
        let _timer = self.metrics.timer("prune_blocks");
        if target <= 0 {
            return Err(StoreError::PruneTargetNotPositive { target });
        }
        let range = *self.range.read();
        if target > range.height {
            return Err(StoreError::PruneBeyondTip {
                target,
                height: range.height,
            });
        }
        if target < range.base {
            return Err(StoreError::PruneBelowBase {
                target,
                base: range.base,
            });
        }

        let evidence_params = &chain_state.consensus_params.evidence;
        let mut pruned = 0u64;
        let mut evidence_retain = target;
        let mut batch = self.db.new_batch();

        for h in range.base..target {
            // Skip heights a previous, partially flushed prune removed.
            let Some(meta) = self.load_block_meta_inner(h) else {
                continue;
            };
            if evidence_retain == target
                && !is_evidence_expired(
                    chain_state.last_block_height,
                    chain_state.last_block_time,
                    h,
                    meta.header.time,
                    evidence_params,
                )
            {
                // Evidence at this height could still be punished; keep
                // proof material from here on up.
                evidence_retain = h;
            }
            if h < evidence_retain {
                batch.delete(keys::block_meta_key(h));
                batch.delete(keys::block_commit_key(h));
            }
            batch.delete(keys::block_hash_key(&meta.block_id.hash));
            batch.delete(keys::seen_commit_key(h));
            batch.delete(keys::extended_commit_key(h));
            for index in 0..meta.block_id.part_set_header.total {
                batch.delete(keys::block_part_key(h, index));
            }
            pruned += 1;
            if pruned % PRUNE_FLUSH_EVERY == 0 {
                self.flush_pruned(batch, h)?;
                batch = self.db.new_batch();
            }
        }

        self.flush_pruned(batch, target)?;
        tracing::info!(
            pruned,
            new_base = target,
            evidence_retain,
            "[block-store] pruned blocks"
        );
        Ok((pruned, evidence_retain))
    }

    /// Remove the block at the current tip and decrement the height.
    ///
    /// The meta is deleted last so the "meta implies parts" reader
    /// invariant holds throughout.
    pub fn delete_latest_block(&self) -> Result<(), StoreError> {
        let _timer = self.metrics.timer("delete_latest_block");
        let target = self.range.read().height;
        let Some(meta) = self.load_block_meta_inner(target) else {
            return Err(StoreError::NoBlockAtTip { height: target });
        };

        let mut batch = self.db.new_batch();
        batch.delete(keys::block_hash_key(&meta.block_id.hash));
        for index in 0..meta.block_id.part_set_header.total {
            batch.delete(keys::block_part_key(target, index));
        }
        batch.delete(keys::block_commit_key(target));
        batch.delete(keys::seen_commit_key(target));
        batch.delete(keys::extended_commit_key(target));
        batch.delete(keys::block_meta_key(target));

        // Deletions reach disk before the shrunk range does; a crash in
        // between leaves a stale height pointing at an already removed tip,
        // never an advertised range missing its data.
        batch.write_sync()?;
        let new_range = {
            let mut range = self.range.write();
            range.height = target - 1;
            *range
        };
        state::save_state(&self.db, &new_range)?;
        tracing::info!(height = target, "[block-store] deleted latest block");
        Ok(())
    }

    /// Close the underlying KV handle.
    pub fn close(&self) -> Result<(), StoreError> {
        self.db.close()?;
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn load_block_meta_inner(&self, height: i64) -> Option<BlockMeta> {
        self.get_decoded(&keys::block_meta_key(height), "block meta")
    }

    fn load_block_inner(&self, height: i64) -> Option<(Block, BlockMeta)> {
        let meta = self.load_block_meta_inner(height)?;
        let mut bytes: Vec<u8> = Vec::new();
        for index in 0..meta.block_id.part_set_header.total {
            // A concurrent prune may have removed parts already; a missing
            // part makes the whole block unavailable, never truncated.
            let part: Part = self.get_decoded(&keys::block_part_key(height, index), "block part")?;
            bytes.extend_from_slice(&part.bytes);
        }
        let block: Block = codec::from_bytes(&bytes)
            .unwrap_or_else(|e| panic!("failed to decode block at height {height}: {e}"));
        Some((block, meta))
    }

    /// Resolve a block hash to its height via the index record.
    fn lookup_hash(&self, hash: &Hash) -> Option<i64> {
        let bytes = self.must_get(&keys::block_hash_key(hash), "block hash index")?;
        let text = std::str::from_utf8(&bytes).unwrap_or_else(|_| {
            panic!(
                "corrupt hash index entry for block {}: not ascii",
                hex::encode(&hash[..8])
            )
        });
        let height = text.parse::<i64>().unwrap_or_else(|e| {
            panic!(
                "corrupt hash index entry for block {}: {e}",
                hex::encode(&hash[..8])
            )
        });
        Some(height)
    }

    fn get_decoded<T: DeserializeOwned>(&self, key: &[u8], what: &str) -> Option<T> {
        let bytes = self.must_get(key, what)?;
        Some(codec::from_bytes(&bytes).unwrap_or_else(|e| panic!("failed to decode {what}: {e}")))
    }

    fn must_get(&self, key: &[u8], what: &str) -> Option<Vec<u8>> {
        self.db
            .get(key)
            .unwrap_or_else(|e| panic!("failed to read {what}: {e}"))
    }

    fn must_set(&self, key: Vec<u8>, value: Vec<u8>, what: &str) {
        self.db
            .set(&key, &value)
            .unwrap_or_else(|e| panic!("failed to write {what}: {e}"));
    }

    /// Shared body of the two save paths. Checks the save invariants, lays
    /// the entities down in reader-safe order and advances the range.
    fn save_block_entities(
        &self,
        block: &Block,
        parts: &PartSet,
        seen_commit: &Commit,
        extended_commit: Option<&ExtendedCommit>,
    ) {
        let height = block.height();
        if height <= 0 {
            panic!("cannot save block at non-positive height {height}");
        }
        {
            let range = self.range.read();
            if range.base > 0 && height != range.height + 1 {
                panic!(
                    "can only save contiguous blocks; wanted {}, got {}",
                    range.height + 1,
                    height
                );
            }
        }
        if !parts.is_complete() {
            panic!("can only save a complete part set (have {}/{})", parts.count(), parts.total());
        }
        if height != seen_commit.height {
            panic!(
                "seen commit height {} does not match block height {}",
                seen_commit.height, height
            );
        }

        // Parts first: a reader that sees the meta must find all of them.
        for index in 0..parts.total() {
            let part = parts
                .part(index)
                .unwrap_or_else(|| panic!("complete part set is missing part {index}"));
            self.must_set(
                keys::block_part_key(height, index),
                must_encode(part, "block part"),
                "block part",
            );
        }

        let meta = BlockMeta::new(block, parts.header().clone());
        self.must_set(
            keys::block_meta_key(height),
            must_encode(&meta, "block meta"),
            "block meta",
        );
        self.must_set(
            keys::block_hash_key(&meta.block_id.hash),
            height.to_string().into_bytes(),
            "block hash index",
        );
        self.must_set(
            keys::block_commit_key(height - 1),
            must_encode(&block.last_commit, "block commit"),
            "block commit",
        );
        if let Some(extended) = extended_commit {
            self.must_set(
                keys::extended_commit_key(height),
                must_encode(extended, "extended commit"),
                "extended commit",
            );
        }
        self.must_set(
            keys::seen_commit_key(height),
            must_encode(seen_commit, "seen commit"),
            "seen commit",
        );

        let new_range = {
            let mut range = self.range.write();
            range.height = height;
            if range.base == 0 {
                range.base = height;
            }
            *range
        };
        state::save_state(&self.db, &new_range)
            .unwrap_or_else(|e| panic!("failed to persist block store state: {e}"));
        tracing::debug!(
            height,
            hash = %hex::encode(&meta.block_id.hash[..8]),
            num_txs = meta.num_txs,
            "[block-store] saved block"
        );
    }

    /// Durably apply a batch of prune deletions, then advance the base.
    ///
    /// The batch is flushed before the base moves, so the advertised base
    /// never climbs past data that is still pending deletion. A crash
    /// after the flush leaves a stale, lower base; the prune loop skips
    /// the already removed heights when it is retried.
    fn flush_pruned(&self, batch: KV::Batch, new_base: i64) -> Result<(), StoreError> {
        batch.write_sync()?;
        let new_range = {
            let mut range = self.range.write();
            range.base = new_base;
            *range
        };
        state::save_state(&self.db, &new_range)?;
        Ok(())
    }
}

fn must_encode<T: Serialize>(value: &T, what: &str) -> Vec<u8> {
    codec::to_bytes(value).unwrap_or_else(|e| panic!("failed to encode {what}: {e}"))
}
