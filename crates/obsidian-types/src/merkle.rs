//! # Merkle Trees
//!
//! Binary Merkle tree with domain-separated leaf and inner hashing, used for
//! part-set roots and transaction data hashes. Leaves are prefixed with
//! `0x00` and inner nodes with `0x01` so a leaf can never be reinterpreted
//! as an inner node.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::entities::Hash;

const LEAF_PREFIX: u8 = 0x00;
const INNER_PREFIX: u8 = 0x01;

/// Hash of the empty tree.
pub fn empty_hash() -> Hash {
    Sha256::digest([]).into()
}

/// Hash a single leaf.
pub fn leaf_hash(leaf: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(leaf);
    hasher.finalize().into()
}

fn inner_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([INNER_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Largest power of two strictly less than `n`.
fn split_point(n: usize) -> usize {
    debug_assert!(n > 1);
    let mut split = 1usize;
    while split * 2 < n {
        split *= 2;
    }
    split
}

/// Compute the Merkle root of a list of byte leaves.
pub fn root_from_leaves(leaves: &[&[u8]]) -> Hash {
    match leaves.len() {
        0 => empty_hash(),
        1 => leaf_hash(leaves[0]),
        n => {
            let split = split_point(n);
            let left = root_from_leaves(&leaves[..split]);
            let right = root_from_leaves(&leaves[split..]);
            inner_hash(&left, &right)
        }
    }
}

/// A Merkle inclusion proof for a single leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Total number of leaves in the tree.
    pub total: u64,
    /// Index of the proven leaf.
    pub index: u64,
    /// Hash of the proven leaf.
    pub leaf_hash: Hash,
    /// Sibling hashes from the leaf up to (but excluding) the root.
    pub aunts: Vec<Hash>,
}

impl Proof {
    /// Verify this proof against an expected root and the raw leaf bytes.
    pub fn verify(&self, root: &Hash, leaf: &[u8]) -> bool {
        if self.leaf_hash != leaf_hash(leaf) {
            return false;
        }
        match self.compute_root() {
            Some(computed) => computed == *root,
            None => false,
        }
    }

    /// Recompute the root from the leaf hash and the aunts.
    pub fn compute_root(&self) -> Option<Hash> {
        compute_root_from_aunts(self.index, self.total, self.leaf_hash, &self.aunts)
    }
}

fn compute_root_from_aunts(index: u64, total: u64, leaf: Hash, aunts: &[Hash]) -> Option<Hash> {
    if index >= total || total == 0 {
        return None;
    }
    match total {
        1 => {
            if aunts.is_empty() {
                Some(leaf)
            } else {
                None
            }
        }
        _ => {
            let (&aunt, rest) = aunts.split_last()?;
            let split = split_point(total as usize) as u64;
            if index < split {
                let left = compute_root_from_aunts(index, split, leaf, rest)?;
                Some(inner_hash(&left, &aunt))
            } else {
                let right = compute_root_from_aunts(index - split, total - split, leaf, rest)?;
                Some(inner_hash(&aunt, &right))
            }
        }
    }
}

/// Compute the root and an inclusion proof for every leaf in one pass.
pub fn proofs_from_leaves(leaves: &[&[u8]]) -> (Hash, Vec<Proof>) {
    let total = leaves.len() as u64;
    let mut proofs: Vec<Proof> = leaves
        .iter()
        .enumerate()
        .map(|(i, leaf)| Proof {
            total,
            index: i as u64,
            leaf_hash: leaf_hash(leaf),
            aunts: Vec::new(),
        })
        .collect();
    let root = fill_aunts(leaves, &mut proofs);
    (root, proofs)
}

/// Recursively compute the subtree root, pushing sibling hashes onto each
/// proof from the leaf level upward. `proofs` covers the same range of
/// leaves as `leaves`.
fn fill_aunts(leaves: &[&[u8]], proofs: &mut [Proof]) -> Hash {
    match leaves.len() {
        0 => empty_hash(),
        1 => leaf_hash(leaves[0]),
        n => {
            let split = split_point(n);
            let (left_proofs, right_proofs) = proofs.split_at_mut(split);
            let left = fill_aunts(&leaves[..split], &mut *left_proofs);
            let right = fill_aunts(&leaves[split..], &mut *right_proofs);
            for proof in left_proofs.iter_mut() {
                proof.aunts.push(right);
            }
            for proof in right_proofs.iter_mut() {
                proof.aunts.push(left);
            }
            inner_hash(&left, &right)
        }
    }
}
