//! # Consensus Parameters
//!
//! The slice of chain-level configuration the persistence layer consults:
//! evidence retention limits and the consensus state snapshot handed to the
//! pruner.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retention limits for Byzantine-behavior evidence.
///
/// Evidence of misbehavior at some height is only punishable while it is
/// younger than BOTH limits, so material proving it must be retained until
/// both have been exceeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceParams {
    /// Maximum evidence age in blocks.
    pub max_age_num_blocks: i64,
    /// Maximum evidence age in wall-clock time.
    pub max_age_duration: Duration,
}

impl Default for EvidenceParams {
    fn default() -> Self {
        Self {
            max_age_num_blocks: 100_000,
            max_age_duration: Duration::from_secs(48 * 60 * 60),
        }
    }
}

/// Chain-level consensus parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Evidence retention limits.
    pub evidence: EvidenceParams,
}

/// Snapshot of the consensus state consulted during pruning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    /// Height of the latest committed block.
    pub last_block_height: i64,
    /// Unix timestamp (seconds) of the latest committed block.
    pub last_block_time: u64,
    /// Parameters in effect at the latest height.
    pub consensus_params: ConsensusParams,
}

/// Whether evidence of misbehavior at `height`/`time` can no longer be
/// punished, judged from the chain tip at `last_height`/`last_time`.
///
/// Evidence expires only when its age exceeds both the block limit and the
/// time limit.
pub fn is_evidence_expired(
    last_height: i64,
    last_time: u64,
    height: i64,
    time: u64,
    params: &EvidenceParams,
) -> bool {
    let age_blocks = last_height - height;
    let age_duration = Duration::from_secs(last_time.saturating_sub(time));
    age_blocks > params.max_age_num_blocks && age_duration > params.max_age_duration
}
