//! Prometheus metrics for Obsidian subsystems.
//!
//! All metrics follow the naming convention: `obsidian_<subsystem>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{exponential_buckets, Encoder, HistogramOpts, HistogramVec, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry.
    pub static ref REGISTRY: Registry = Registry::new();
}

/// Build a duration histogram with exponential buckets from 100µs to ~0.4s.
///
/// The caller registers the returned collector against a registry of its
/// choosing; construction and registration are separate so tests can use
/// throwaway registries.
pub fn duration_histogram(
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<HistogramVec, TelemetryError> {
    let buckets = exponential_buckets(0.0001, 2.0, 12)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    HistogramVec::new(HistogramOpts::new(name, help).buckets(buckets), labels)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Encode all metrics in a registry as Prometheus text format.
pub fn encode_metrics(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::Encode(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Encode(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: prometheus::Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &prometheus::Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_histogram_registers() {
        let registry = Registry::new();
        let hist = duration_histogram("test_op_duration_seconds", "test", &["method"]).unwrap();
        registry.register(Box::new(hist.clone())).unwrap();

        hist.with_label_values(&["read"]).observe(0.001);

        let text = encode_metrics(&registry).unwrap();
        assert!(text.contains("test_op_duration_seconds"));
        assert!(text.contains("method=\"read\""));
    }

    #[test]
    fn test_histogram_timer_observes_on_drop() {
        let hist = duration_histogram("test_timer_seconds", "test", &["method"]).unwrap();
        let labelled = hist.with_label_values(&["op"]);
        {
            let _timer = HistogramTimer::new(&labelled);
        }
        assert_eq!(labelled.get_sample_count(), 1);
    }

    #[test]
    fn test_global_registry_is_usable() {
        let text = encode_metrics(&REGISTRY).unwrap();
        // Nothing registered by default.
        let _ = text;
    }
}
