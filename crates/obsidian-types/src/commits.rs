//! # Commits
//!
//! The precommit aggregates certifying a block. The same structure is
//! persisted under two roles: the canonical commit embedded in the next
//! block, and the locally observed "seen" commit used for restart
//! catch-up. Extended commits additionally carry per-vote application
//! extensions.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use thiserror::Error;

use crate::entities::{Address, BlockId, Signature};

/// How a validator's slot in a commit was filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockIdFlag {
    /// The validator did not vote.
    Absent,
    /// The validator voted for the committed block.
    Commit,
    /// The validator voted for nil.
    Nil,
}

/// A single precommit within a commit.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSig {
    /// Whether and how this validator voted.
    pub flag: BlockIdFlag,
    /// Address of the voting validator.
    pub validator_address: Address,
    /// Unix timestamp (seconds) of the vote.
    pub timestamp: u64,
    /// Signature over the vote.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl CommitSig {
    /// An absent vote slot.
    pub fn absent() -> Self {
        Self {
            flag: BlockIdFlag::Absent,
            validator_address: [0; 20],
            timestamp: 0,
            signature: [0; 64],
        }
    }
}

/// The set of precommits from more than two thirds of voting power for a
/// given block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Height of the committed block.
    pub height: i64,
    /// Consensus round in which the commit was formed.
    pub round: i32,
    /// Identity of the committed block.
    pub block_id: BlockId,
    /// One entry per validator, in validator-set order.
    pub signatures: Vec<CommitSig>,
}

impl Default for Commit {
    fn default() -> Self {
        Self {
            height: 0,
            round: 0,
            block_id: BlockId::default(),
            signatures: Vec::new(),
        }
    }
}

/// Errors raised when validating vote extensions on an extended commit.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("vote for validator {validator} at height {height} is missing its extension signature")]
    MissingExtension { height: i64, validator: String },

    #[error("vote for validator {validator} at height {height} carries an unexpected extension")]
    UnexpectedExtension { height: i64, validator: String },
}

/// A precommit plus the application's vote extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedCommitSig {
    /// The underlying precommit.
    pub commit_sig: CommitSig,
    /// Application payload attached at vote time.
    pub extension: Vec<u8>,
    /// Validator signature over the extension.
    pub extension_signature: Vec<u8>,
}

/// A seen commit augmented with per-vote extension payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedCommit {
    /// Height of the committed block.
    pub height: i64,
    /// Consensus round in which the commit was formed.
    pub round: i32,
    /// Identity of the committed block.
    pub block_id: BlockId,
    /// One extended entry per validator, in validator-set order.
    pub extended_signatures: Vec<ExtendedCommitSig>,
}

impl ExtendedCommit {
    /// Check that extension data matches expectations.
    ///
    /// With `expect_extensions`, every `Commit`-flagged vote must carry an
    /// extension signature. Without it, no vote may carry extension data at
    /// all. Absent and nil votes never carry extensions.
    pub fn ensure_extensions(&self, expect_extensions: bool) -> Result<(), CommitError> {
        for sig in &self.extended_signatures {
            if sig.commit_sig.flag != BlockIdFlag::Commit {
                continue;
            }
            let validator = hex_addr(&sig.commit_sig.validator_address);
            if expect_extensions && sig.extension_signature.is_empty() {
                return Err(CommitError::MissingExtension {
                    height: self.height,
                    validator,
                });
            }
            if !expect_extensions
                && (!sig.extension.is_empty() || !sig.extension_signature.is_empty())
            {
                return Err(CommitError::UnexpectedExtension {
                    height: self.height,
                    validator,
                });
            }
        }
        Ok(())
    }

    /// Project down to a plain commit by stripping the extensions.
    pub fn to_commit(&self) -> Commit {
        Commit {
            height: self.height,
            round: self.round,
            block_id: self.block_id.clone(),
            signatures: self
                .extended_signatures
                .iter()
                .map(|sig| sig.commit_sig.clone())
                .collect(),
        }
    }
}

fn hex_addr(address: &Address) -> String {
    address.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_sig(flag: BlockIdFlag) -> CommitSig {
        CommitSig {
            flag,
            validator_address: [0x11; 20],
            timestamp: 1234,
            signature: [0x22; 64],
        }
    }

    fn extended(flag: BlockIdFlag, extension: &[u8], ext_sig: &[u8]) -> ExtendedCommitSig {
        ExtendedCommitSig {
            commit_sig: commit_sig(flag),
            extension: extension.to_vec(),
            extension_signature: ext_sig.to_vec(),
        }
    }

    fn extended_commit(sigs: Vec<ExtendedCommitSig>) -> ExtendedCommit {
        ExtendedCommit {
            height: 5,
            round: 0,
            block_id: BlockId {
                hash: [0xAB; 32],
                part_set_header: Default::default(),
            },
            extended_signatures: sigs,
        }
    }

    #[test]
    fn test_ensure_extensions_all_present() {
        let ec = extended_commit(vec![
            extended(BlockIdFlag::Commit, b"ext", b"sig"),
            extended(BlockIdFlag::Commit, b"", b"sig-only"),
        ]);
        assert!(ec.ensure_extensions(true).is_ok());
    }

    #[test]
    fn test_ensure_extensions_missing_signature() {
        let ec = extended_commit(vec![
            extended(BlockIdFlag::Commit, b"ext", b"sig"),
            extended(BlockIdFlag::Commit, b"ext", b""),
        ]);
        assert!(matches!(
            ec.ensure_extensions(true),
            Err(CommitError::MissingExtension { height: 5, .. })
        ));
    }

    #[test]
    fn test_ensure_extensions_skips_absent_and_nil_votes() {
        let ec = extended_commit(vec![
            extended(BlockIdFlag::Absent, b"", b""),
            extended(BlockIdFlag::Nil, b"", b""),
            extended(BlockIdFlag::Commit, b"ext", b"sig"),
        ]);
        assert!(ec.ensure_extensions(true).is_ok());
    }

    #[test]
    fn test_ensure_no_extensions_rejects_payload() {
        let ec = extended_commit(vec![extended(BlockIdFlag::Commit, b"ext", b"")]);
        assert!(matches!(
            ec.ensure_extensions(false),
            Err(CommitError::UnexpectedExtension { .. })
        ));
    }

    #[test]
    fn test_extended_commit_wire_roundtrip() {
        let ec = extended_commit(vec![
            extended(BlockIdFlag::Commit, b"ext", b"sig"),
            extended(BlockIdFlag::Absent, b"", b""),
        ]);
        let bytes = bincode::serialize(&ec).unwrap();
        let decoded: ExtendedCommit = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, ec);
    }

    #[test]
    fn test_to_commit_strips_extensions() {
        let ec = extended_commit(vec![
            extended(BlockIdFlag::Commit, b"ext-a", b"sig-a"),
            extended(BlockIdFlag::Nil, b"", b""),
        ]);
        let commit = ec.to_commit();
        assert_eq!(commit.height, ec.height);
        assert_eq!(commit.block_id, ec.block_id);
        assert_eq!(commit.signatures.len(), 2);
        assert_eq!(commit.signatures[0], ec.extended_signatures[0].commit_sig);
    }
}
