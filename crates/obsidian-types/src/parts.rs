//! # Block Parts
//!
//! A block is split into fixed-size parts for gossip. The part set carries a
//! Merkle proof per part so peers can verify chunks independently before the
//! whole block has arrived. Concatenating all parts in index order yields
//! the serialized block.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::Hash;
use crate::merkle::{self, Proof};

/// Default size of a block part in bytes.
pub const BLOCK_PART_SIZE: usize = 65536;

/// Errors raised while assembling a part set from the network.
#[derive(Debug, Error)]
pub enum PartSetError {
    #[error("part index {index} out of range (total {total})")]
    IndexOutOfRange { index: u32, total: u32 },

    #[error("part {index} failed Merkle proof verification")]
    InvalidProof { index: u32 },
}

/// Summary of a part set: how many parts, and the Merkle root over them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSetHeader {
    /// Number of parts the block was split into.
    pub total: u32,
    /// Merkle root over the part payloads.
    pub hash: Hash,
}

impl PartSetHeader {
    /// True for the zero value, which identifies "no block".
    pub fn is_zero(&self) -> bool {
        self.total == 0 && self.hash == [0; 32]
    }
}

/// A single chunk of a serialized block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// Position of this part within the set.
    pub index: u32,
    /// The payload chunk.
    pub bytes: Vec<u8>,
    /// Inclusion proof of this chunk under the part-set root.
    pub proof: Proof,
}

/// A (possibly incomplete) collection of block parts.
#[derive(Debug, Clone)]
pub struct PartSet {
    header: PartSetHeader,
    parts: Vec<Option<Part>>,
    count: u32,
}

impl PartSet {
    /// Split serialized block bytes into a complete part set.
    ///
    /// Every part gets an inclusion proof under the set's Merkle root. An
    /// empty input still produces a single (empty) part so that a block is
    /// never represented by a zero-part set.
    pub fn from_bytes(data: &[u8], part_size: usize) -> Self {
        assert!(part_size > 0, "part size must be positive");
        let chunks: Vec<&[u8]> = if data.is_empty() {
            vec![&[]]
        } else {
            data.chunks(part_size).collect()
        };
        let (root, proofs) = merkle::proofs_from_leaves(&chunks);
        let total = chunks.len() as u32;
        let parts = chunks
            .iter()
            .zip(proofs)
            .enumerate()
            .map(|(index, (chunk, proof))| {
                Some(Part {
                    index: index as u32,
                    bytes: chunk.to_vec(),
                    proof,
                })
            })
            .collect();
        Self {
            header: PartSetHeader { total, hash: root },
            parts,
            count: total,
        }
    }

    /// An empty part set awaiting parts gossiped by peers.
    pub fn from_header(header: PartSetHeader) -> Self {
        let total = header.total as usize;
        Self {
            header,
            parts: vec![None; total],
            count: 0,
        }
    }

    /// Summary of this part set.
    pub fn header(&self) -> &PartSetHeader {
        &self.header
    }

    /// Number of parts in the complete set.
    pub fn total(&self) -> u32 {
        self.header.total
    }

    /// Number of parts currently present.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// True when every part up to `total` is present.
    pub fn is_complete(&self) -> bool {
        self.count == self.header.total
    }

    /// The part at `index`, if present.
    pub fn part(&self, index: u32) -> Option<&Part> {
        self.parts.get(index as usize).and_then(|p| p.as_ref())
    }

    /// Add a gossiped part after verifying its proof against the set root.
    ///
    /// Returns `true` if the part was added, `false` if that slot was
    /// already filled.
    pub fn add_part(&mut self, part: Part) -> Result<bool, PartSetError> {
        let index = part.index;
        if index >= self.header.total {
            return Err(PartSetError::IndexOutOfRange {
                index,
                total: self.header.total,
            });
        }
        if !part.proof.verify(&self.header.hash, &part.bytes) {
            return Err(PartSetError::InvalidProof { index });
        }
        let slot = &mut self.parts[index as usize];
        if slot.is_some() {
            return Ok(false);
        }
        *slot = Some(part);
        self.count += 1;
        Ok(true)
    }

    /// Concatenate all part payloads in index order.
    ///
    /// Only meaningful for a complete set; missing parts are skipped.
    pub fn assemble(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for part in self.parts.iter().flatten() {
            bytes.extend_from_slice(&part.bytes);
        }
        bytes
    }
}
