//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_with_registry, Counter, CounterVec, Histogram, HistogramOpts, Opts,
    Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Process-wide metrics handle
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Packing
    pub packs: Counter,
    pub batches_per_pack: Histogram,
    pub batch_overflows: Counter,

    // Oracle calls made by the reducer, by stage
    pub oracle_calls: CounterVec,

    // Raw model requests, including retries
    pub model_requests: CounterVec,
    pub model_request_duration: Histogram,

    // Whole reductions
    pub reductions: CounterVec,
    pub reduction_rounds: Histogram,
}

impl Metrics {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let packs = register_counter_with_registry!(
            Opts::new("context_packs_total", "Total packing passes"),
            registry
        )?;

        let batches_per_pack = register_histogram_with_registry!(
            HistogramOpts::new("context_batches_per_pack", "Batches produced per packing pass")
                .buckets(vec![1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0, 34.0]),
            registry
        )?;

        let batch_overflows = register_counter_with_registry!(
            Opts::new(
                "context_batch_overflows_total",
                "Batches whose token total exceeded the limit"
            ),
            registry
        )?;

        let oracle_calls = register_counter_vec_with_registry!(
            Opts::new("summarizer_oracle_calls_total", "Summarization calls per stage"),
            &["stage", "status"],
            registry
        )?;

        let model_requests = register_counter_vec_with_registry!(
            Opts::new("llm_requests_total", "Chat completion requests"),
            &["status"],
            registry
        )?;

        let model_request_duration = register_histogram_with_registry!(
            "llm_request_duration_seconds",
            "Chat completion duration in seconds, retries included",
            registry
        )?;

        let reductions = register_counter_vec_with_registry!(
            Opts::new("summarizer_reductions_total", "Hierarchical reductions"),
            &["status"],
            registry
        )?;

        let reduction_rounds = register_histogram_with_registry!(
            HistogramOpts::new("summarizer_reduction_rounds", "Rounds per reduction")
                .buckets(vec![1.0, 2.0, 3.0, 4.0, 6.0, 8.0]),
            registry
        )?;

        Ok(Self {
            registry,
            packs,
            batches_per_pack,
            batch_overflows,
            oracle_calls,
            model_requests,
            model_request_duration,
            reductions,
            reduction_rounds,
        })
    }

    /// Record one packing pass
    pub fn record_pack(&self, batches: usize, overflowing: usize) {
        self.packs.inc();
        self.batches_per_pack.observe(batches as f64);
        if overflowing > 0 {
            self.batch_overflows.inc_by(overflowing as f64);
        }
    }

    /// Record one summarization call made by the reducer
    pub fn record_oracle_call(&self, stage: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.oracle_calls.with_label_values(&[stage, status]).inc();
    }

    /// Record one chat completion request
    pub fn record_model_call(&self, success: bool, elapsed: Duration) {
        let status = if success { "success" } else { "error" };
        self.model_requests.with_label_values(&[status]).inc();
        self.model_request_duration.observe(elapsed.as_secs_f64());
    }

    /// Record the outcome of a reduction
    pub fn record_reduction(&self, success: bool, rounds: usize) {
        let status = if success { "success" } else { "error" };
        self.reductions.with_label_values(&[status]).inc();
        self.reduction_rounds.observe(rounds as f64);
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        let metrics = Metrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_record_and_export() {
        let metrics = Metrics::new().unwrap();
        metrics.record_pack(3, 1);
        metrics.record_oracle_call("messages", true);
        metrics.record_oracle_call("summaries", false);
        metrics.record_model_call(true, Duration::from_millis(20));
        metrics.record_reduction(true, 2);

        let exported = metrics.export_prometheus();
        assert!(exported.contains("context_packs_total 1"));
        assert!(exported.contains("context_batch_overflows_total 1"));
        assert!(exported.contains("summarizer_oracle_calls_total"));
        assert!(exported.contains("stage=\"summaries\""));
    }

    #[test]
    fn test_global_handle_records() {
        METRICS.record_pack(1, 0);
        assert!(METRICS.packs.get() >= 1.0);
    }
}
