//! # Obsidian Telemetry
//!
//! Prometheus metrics plumbing shared by Obsidian subsystems.
//!
//! Subsystems construct their own labelled collectors with
//! [`duration_histogram`], register them against a [`prometheus::Registry`]
//! (their own or the global [`REGISTRY`]), and time operations with the
//! [`HistogramTimer`] drop guard.

mod metrics;

pub use metrics::{duration_histogram, encode_metrics, HistogramTimer, REGISTRY};

use thiserror::Error;

/// Errors raised while setting up or exporting telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("metrics initialization failed: {0}")]
    MetricsInit(String),

    #[error("metrics encoding failed: {0}")]
    Encode(String),
}
