//! # Obsidian Shared Types
//!
//! Core consensus entities shared between the consensus engine and the
//! persistence layer.
//!
//! ## Clusters
//!
//! - **Chain**: `Header`, `Block`, `Data`, `BlockId`, `BlockMeta`
//! - **Propagation**: `Part`, `PartSet`, `PartSetHeader`, Merkle proofs
//! - **Consensus**: `Commit`, `CommitSig`, `ExtendedCommit`
//! - **Parameters**: `ConsensusParams`, `EvidenceParams`, `ChainState`

pub mod commits;
pub mod entities;
pub mod merkle;
pub mod params;
pub mod parts;

// Re-export key types for convenience
pub use commits::{BlockIdFlag, Commit, CommitError, CommitSig, ExtendedCommit, ExtendedCommitSig};
pub use entities::{Address, Block, BlockId, BlockMeta, Data, Hash, Header, Signature, Tx};
pub use merkle::Proof;
pub use params::{is_evidence_expired, ChainState, ConsensusParams, EvidenceParams};
pub use parts::{Part, PartSet, PartSetError, PartSetHeader, BLOCK_PART_SIZE};
