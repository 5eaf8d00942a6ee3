//! Test fixtures: deterministic blocks, commits and part sets.

use std::time::Duration;

use obsidian_types::{
    Block, BlockId, BlockIdFlag, ChainState, Commit, CommitSig, ConsensusParams, Data,
    EvidenceParams, ExtendedCommit, ExtendedCommitSig, Header, PartSet,
};

use crate::adapters::MemoryKv;
use crate::codec;
use crate::store::BlockStore;

pub const CHAIN_ID: &str = "obsidian-test";

/// Block timestamps start here; block at height `h` has time `BASE_TIME + h`.
pub const BASE_TIME: u64 = 10_000;

/// Small part size so even tiny test blocks split into several parts.
pub const TEST_PART_SIZE: usize = 64;

pub fn make_commit(height: i64, round: i32, block_id: BlockId) -> Commit {
    Commit {
        height,
        round,
        block_id,
        signatures: vec![
            CommitSig {
                flag: BlockIdFlag::Commit,
                validator_address: [0x11; 20],
                timestamp: BASE_TIME + height as u64,
                signature: [0x22; 64],
            },
            CommitSig {
                flag: BlockIdFlag::Commit,
                validator_address: [0x33; 20],
                timestamp: BASE_TIME + height as u64,
                signature: [0x44; 64],
            },
            CommitSig {
                flag: BlockIdFlag::Nil,
                validator_address: [0x55; 20],
                timestamp: BASE_TIME + height as u64,
                signature: [0x66; 64],
            },
        ],
    }
}

pub fn make_block(height: i64, last_commit: Commit) -> Block {
    let data = Data {
        txs: vec![height.to_le_bytes().to_vec(), vec![height as u8; 24]],
    };
    let header = Header {
        version: 1,
        chain_id: CHAIN_ID.to_string(),
        height,
        time: BASE_TIME + height as u64,
        last_block_id: last_commit.block_id.clone(),
        data_hash: data.hash(),
        app_hash: [0x0A; 32],
        proposer_address: [0xAA; 20],
    };
    Block {
        header,
        data,
        last_commit,
    }
}

pub fn make_part_set(block: &Block) -> PartSet {
    let bytes = codec::to_bytes(block).unwrap();
    PartSet::from_bytes(&bytes, TEST_PART_SIZE)
}

pub fn block_id(block: &Block, parts: &PartSet) -> BlockId {
    BlockId {
        hash: block.hash(),
        part_set_header: parts.header().clone(),
    }
}

/// An extended commit for `block_id`; with `with_extensions` unset, one
/// `Commit`-flagged vote is left without its extension signature.
pub fn make_extended_commit(
    height: i64,
    block_id: BlockId,
    with_extensions: bool,
) -> ExtendedCommit {
    let commit = make_commit(height, 1, block_id.clone());
    let extended_signatures = commit
        .signatures
        .iter()
        .enumerate()
        .map(|(i, sig)| {
            let voted = sig.flag == BlockIdFlag::Commit;
            ExtendedCommitSig {
                commit_sig: sig.clone(),
                extension: if voted {
                    format!("extension-{i}").into_bytes()
                } else {
                    Vec::new()
                },
                extension_signature: if voted && (with_extensions || i == 0) {
                    format!("extension-sig-{i}").into_bytes()
                } else {
                    Vec::new()
                },
            }
        })
        .collect();
    ExtendedCommit {
        height,
        round: 1,
        block_id,
        extended_signatures,
    }
}

/// Save a contiguous chain at heights `1..=count`; seen commits use round 1
/// so they are distinguishable from the canonical round-0 commits.
pub fn save_chain(store: &BlockStore<MemoryKv>, count: i64) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut prev_id = BlockId::default();
    for height in 1..=count {
        let last_commit = if height == 1 {
            Commit::default()
        } else {
            make_commit(height - 1, 0, prev_id.clone())
        };
        let block = make_block(height, last_commit);
        let parts = make_part_set(&block);
        let id = block_id(&block, &parts);
        let seen_commit = make_commit(height, 1, id.clone());
        store.save_block(&block, &parts, &seen_commit);
        prev_id = id;
        blocks.push(block);
    }
    blocks
}

/// A consensus state snapshot whose time-age limit is always exceeded, so
/// evidence expiry is governed by `max_age_num_blocks` alone.
pub fn chain_state(last_block_height: i64, max_age_num_blocks: i64) -> ChainState {
    ChainState {
        last_block_height,
        last_block_time: BASE_TIME + 100_000_000,
        consensus_params: ConsensusParams {
            evidence: EvidenceParams {
                max_age_num_blocks,
                max_age_duration: Duration::from_secs(1),
            },
        },
    }
}

/// A store over a fresh in-memory database, plus a handle to that database.
pub fn make_store() -> (BlockStore<MemoryKv>, MemoryKv) {
    let db = MemoryKv::new();
    (BlockStore::new(db.clone()), db)
}

/// Compile-time check that the engine stays `Send + Sync` so readers can
/// share it across threads.
#[allow(dead_code)]
fn engine_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BlockStore<MemoryKv>>();
}
