//! # Chain Entities
//!
//! The block, header and block-meta definitions shared between the
//! consensus engine and the block store.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::commits::Commit;
use crate::merkle;
use crate::parts::PartSetHeader;

/// A 32-byte hash (SHA-256).
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 20-byte validator address (truncated public key hash).
pub type Address = [u8; 20];

/// A raw transaction payload, opaque to the persistence layer.
pub type Tx = Vec<u8>;

/// The header of a block containing metadata and root hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Protocol version for this block.
    pub version: u16,
    /// Identifier of the chain this block belongs to.
    pub chain_id: String,
    /// Block height in the chain.
    pub height: i64,
    /// Unix timestamp (seconds) at which the block was proposed.
    pub time: u64,
    /// Identity of the previous block (creates the chain linkage).
    pub last_block_id: BlockId,
    /// Merkle root of all transactions in the block.
    pub data_hash: Hash,
    /// Root hash of the application state after the previous block.
    pub app_hash: Hash,
    /// The validator who proposed this block.
    pub proposer_address: Address,
}

impl Header {
    /// Compute the header hash, which identifies the block.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_le_bytes());
        hasher.update(self.chain_id.as_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.time.to_le_bytes());
        hasher.update(self.last_block_id.hash);
        hasher.update(self.last_block_id.part_set_header.total.to_le_bytes());
        hasher.update(self.last_block_id.part_set_header.hash);
        hasher.update(self.data_hash);
        hasher.update(self.app_hash);
        hasher.update(self.proposer_address);
        hasher.finalize().into()
    }
}

/// The transaction payload of a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    /// All transactions in the block, in execution order.
    pub txs: Vec<Tx>,
}

impl Data {
    /// Merkle root over the raw transactions.
    pub fn hash(&self) -> Hash {
        let leaves: Vec<&[u8]> = self.txs.iter().map(|tx| tx.as_slice()).collect();
        merkle::root_from_leaves(&leaves)
    }
}

/// A complete consensus block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The block header.
    pub header: Header,
    /// The transaction payload.
    pub data: Data,
    /// The commit certifying the previous block.
    pub last_commit: Commit,
}

impl Block {
    /// The hash identifying this block (the header hash).
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// The height of this block.
    pub fn height(&self) -> i64 {
        self.header.height
    }
}

/// Identity of a block: its hash plus the header of the part set it was
/// gossiped as. Two validators agree on a block only if both match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockId {
    /// The block (header) hash.
    pub hash: Hash,
    /// Summary of the part set carrying the block.
    pub part_set_header: PartSetHeader,
}

/// Summary record for a stored block.
///
/// The meta is written after all parts at its height, so a reader that
/// observes a meta can always assemble the full block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMeta {
    /// Identity of the block.
    pub block_id: BlockId,
    /// The full block header.
    pub header: Header,
    /// Number of transactions in the block.
    pub num_txs: u64,
}

impl BlockMeta {
    /// Build the meta record for a block and the part set it was split into.
    pub fn new(block: &Block, part_set_header: PartSetHeader) -> Self {
        Self {
            block_id: BlockId {
                hash: block.hash(),
                part_set_header,
            },
            header: block.header.clone(),
            num_txs: block.data.txs.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commits::Commit;

    fn make_header(height: i64) -> Header {
        Header {
            version: 1,
            chain_id: "obsidian-test".to_string(),
            height,
            time: 1000 + height as u64,
            last_block_id: BlockId::default(),
            data_hash: [0; 32],
            app_hash: [0; 32],
            proposer_address: [0xAA; 20],
        }
    }

    #[test]
    fn test_header_hash_is_deterministic() {
        let header = make_header(7);
        assert_eq!(header.hash(), header.hash());
    }

    #[test]
    fn test_header_hash_changes_with_height() {
        assert_ne!(make_header(1).hash(), make_header(2).hash());
    }

    #[test]
    fn test_data_hash_empty_vs_nonempty() {
        let empty = Data::default();
        let nonempty = Data {
            txs: vec![vec![1, 2, 3]],
        };
        assert_ne!(empty.hash(), nonempty.hash());
    }

    #[test]
    fn test_block_meta_counts_txs() {
        let block = Block {
            header: make_header(3),
            data: Data {
                txs: vec![vec![0x01], vec![0x02]],
            },
            last_commit: Commit::default(),
        };
        let meta = BlockMeta::new(&block, PartSetHeader::default());
        assert_eq!(meta.num_txs, 2);
        assert_eq!(meta.block_id.hash, block.hash());
        assert_eq!(meta.header.height, 3);
    }
}
