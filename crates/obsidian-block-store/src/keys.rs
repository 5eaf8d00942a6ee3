//! # Key Codec
//!
//! Order-preserving binary keys over the flat KV namespace. Keys are built
//! from a typed tuple: a small-integer family prefix, followed by integer
//! components, optionally terminated by an opaque byte-string component.
//!
//! Integer components use a length-prefixed big-endian encoding: one length
//! byte (the number of significant bytes, 0 for zero) followed by the
//! minimal big-endian representation. For nonnegative values this sorts
//! byte-lexicographically in numeric order: a shorter encoding always
//! precedes a longer one, and equal-length encodings compare as their
//! big-endian payloads. Opaque byte strings are appended raw and must be
//! the final component.

use obsidian_types::Hash;

/// The sentinel key holding the persisted [`crate::BlockStoreState`].
pub const STORE_STATE_KEY: &[u8] = b"blockStore";

/// The six key families sharing the KV namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Block meta by height.
    BlockMeta = 0,
    /// Block part by height and part index.
    BlockPart = 1,
    /// Canonical block commit by height.
    BlockCommit = 2,
    /// Extended commit by height.
    ExtendedCommit = 3,
    /// Seen commit by height.
    SeenCommit = 4,
    /// Block hash to height index.
    BlockHash = 5,
}

/// Append the order-preserving encoding of a nonnegative integer.
fn put_uint(buf: &mut Vec<u8>, value: u64) {
    let be = value.to_be_bytes();
    let skip = be.iter().take_while(|b| **b == 0).count();
    let significant = &be[skip..];
    buf.push(significant.len() as u8);
    buf.extend_from_slice(significant);
}

/// Append a height component.
///
/// Heights are nonnegative by contract; encoding is monotonic only over
/// that domain.
fn put_height(buf: &mut Vec<u8>, height: i64) {
    debug_assert!(height >= 0, "heights are nonnegative");
    put_uint(buf, height as u64);
}

impl KeyPrefix {
    fn begin(self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        put_uint(&mut buf, self as u64);
        buf
    }
}

/// Key of the block meta at `height`.
pub fn block_meta_key(height: i64) -> Vec<u8> {
    let mut key = KeyPrefix::BlockMeta.begin();
    put_height(&mut key, height);
    key
}

/// Key of part `index` of the block at `height`.
pub fn block_part_key(height: i64, index: u32) -> Vec<u8> {
    let mut key = KeyPrefix::BlockPart.begin();
    put_height(&mut key, height);
    put_uint(&mut key, u64::from(index));
    key
}

/// Key of the canonical commit stored at `height`.
pub fn block_commit_key(height: i64) -> Vec<u8> {
    let mut key = KeyPrefix::BlockCommit.begin();
    put_height(&mut key, height);
    key
}

/// Key of the extended commit at `height`.
pub fn extended_commit_key(height: i64) -> Vec<u8> {
    let mut key = KeyPrefix::ExtendedCommit.begin();
    put_height(&mut key, height);
    key
}

/// Key of the seen commit at `height`.
pub fn seen_commit_key(height: i64) -> Vec<u8> {
    let mut key = KeyPrefix::SeenCommit.begin();
    put_height(&mut key, height);
    key
}

/// Key of the hash-to-height index entry for `hash`.
///
/// The hash is an opaque byte string and therefore the final component.
pub fn block_hash_key(hash: &Hash) -> Vec<u8> {
    let mut key = KeyPrefix::BlockHash.begin();
    key.extend_from_slice(hash);
    key
}
