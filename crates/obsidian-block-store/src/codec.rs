//! # Serialization Adapter
//!
//! Deterministic, round-trippable binary encoding for every entity the
//! store persists. Encoding is bincode over the serde representations in
//! `obsidian-types`.
//!
//! The store treats both failure directions as fatal: an encode failure is
//! a programmer error, a decode failure means the on-disk bytes are
//! corrupt. The adapter itself stays non-panicking and returns
//! [`CodecError`]; the engine escalates at its boundary.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Serialization adapter errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

/// Encode an entity to its on-disk representation.
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode an entity from its on-disk representation.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BlockStoreState;
    use obsidian_types::{Commit, PartSet};

    #[test]
    fn test_state_roundtrip() {
        let state = BlockStoreState {
            base: 12,
            height: 345,
        };
        let bytes = to_bytes(&state).unwrap();
        let decoded: BlockStoreState = from_bytes(&bytes).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_commit_roundtrip() {
        let commit = Commit::default();
        let bytes = to_bytes(&commit).unwrap();
        let decoded: Commit = from_bytes(&bytes).unwrap();
        assert_eq!(decoded, commit);
    }

    #[test]
    fn test_part_roundtrip() {
        let set = PartSet::from_bytes(&[1, 2, 3, 4, 5, 6], 4);
        let part = set.part(1).unwrap();
        let bytes = to_bytes(part).unwrap();
        let decoded: obsidian_types::Part = from_bytes(&bytes).unwrap();
        assert_eq!(&decoded, part);
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        let result: Result<Commit, _> = from_bytes(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}
