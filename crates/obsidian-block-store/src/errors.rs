//! # Store Errors
//!
//! Recoverable error types for the block store.
//!
//! Only operational conditions surface as errors: pruning outside the
//! stored range, deleting from an empty store, and KV failures bubbled up
//! from the underlying engine. Corruption and caller contract violations
//! are fatal and panic instead; a store that cannot decode its own bytes
//! must not keep serving reads.

use thiserror::Error;

use crate::ports::KvError;

/// Errors that can occur during recoverable store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Prune target must be a positive height.
    #[error("cannot prune to height {target}: height must be greater than 0")]
    PruneTargetNotPositive { target: i64 },

    /// Prune target lies beyond the current tip.
    #[error("cannot prune beyond the latest height {height} (requested {target})")]
    PruneBeyondTip { target: i64, height: i64 },

    /// Prune target lies below the current base.
    #[error("cannot prune to height {target}: it is lower than the base height {base}")]
    PruneBelowBase { target: i64, base: i64 },

    /// No block to delete at the current tip.
    #[error("no block found at the latest height {height}")]
    NoBlockAtTip { height: i64 },

    /// Error bubbled up from the key-value engine.
    #[error("database error: {0}")]
    Database(#[from] KvError),
}
