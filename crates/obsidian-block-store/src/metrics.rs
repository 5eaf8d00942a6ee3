//! # Store Metrics
//!
//! Wall-clock latency of every public store operation, recorded into one
//! histogram labelled by method name. With no registry supplied all
//! observations are no-ops.

use obsidian_telemetry::{duration_histogram, HistogramTimer, TelemetryError};
use prometheus::{HistogramVec, Registry};

/// Latency metrics for the block store.
#[derive(Clone)]
pub struct Metrics {
    op_seconds: Option<HistogramVec>,
}

impl Metrics {
    /// Build the store histogram and register it.
    pub fn new(registry: &Registry) -> Result<Self, TelemetryError> {
        let op_seconds = duration_histogram(
            "obsidian_store_op_duration_seconds",
            "Time spent in block store operations",
            &["method"],
        )?;
        registry
            .register(Box::new(op_seconds.clone()))
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        Ok(Self {
            op_seconds: Some(op_seconds),
        })
    }

    /// A metrics handle that records nothing.
    pub fn noop() -> Self {
        Self { op_seconds: None }
    }

    /// Start timing `method`; the observation lands when the guard drops.
    pub(crate) fn timer(&self, method: &'static str) -> Option<HistogramTimer> {
        self.op_seconds
            .as_ref()
            .map(|h| HistogramTimer::new(&h.with_label_values(&[method])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obsidian_telemetry::encode_metrics;

    #[test]
    fn test_noop_metrics_record_nothing() {
        let metrics = Metrics::noop();
        assert!(metrics.timer("load_block").is_none());
    }

    #[test]
    fn test_registered_metrics_observe_by_method() {
        let registry = Registry::new();
        let metrics = Metrics::new(&registry).unwrap();
        {
            let _timer = metrics.timer("save_block");
        }
        {
            let _timer = metrics.timer("load_block");
        }
        let text = encode_metrics(&registry).unwrap();
        assert!(text.contains("method=\"save_block\""));
        assert!(text.contains("method=\"load_block\""));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        let _first = Metrics::new(&registry).unwrap();
        assert!(Metrics::new(&registry).is_err());
    }
}
