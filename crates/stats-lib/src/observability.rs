//! Observability infrastructure for the stats engine
//!
//! Provides:
//! - Prometheus metrics (request latency and errors, backend query latency
//!   and errors, rows returned)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, HistogramVec,
    IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Buckets for request and backend query latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

static GLOBAL_METRICS: OnceLock<StatMetricsInner> = OnceLock::new();

struct StatMetricsInner {
    request_duration_seconds: HistogramVec,
    request_errors: IntCounterVec,
    backend_query_duration_seconds: HistogramVec,
    backend_query_errors: IntCounterVec,
    rows_returned: IntGaugeVec,
}

impl StatMetricsInner {
    fn new() -> Self {
        Self {
            request_duration_seconds: register_histogram_vec!(
                "stats_api_request_duration_seconds",
                "Time spent answering summary requests",
                &["operation"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register request_duration_seconds"),

            request_errors: register_int_counter_vec!(
                "stats_api_request_errors_total",
                "Summary requests that failed, by error class",
                &["operation", "class"]
            )
            .expect("Failed to register request_errors_total"),

            backend_query_duration_seconds: register_histogram_vec!(
                "stats_api_backend_query_duration_seconds",
                "Time spent on individual metrics backend queries",
                &["query"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register backend_query_duration_seconds"),

            backend_query_errors: register_int_counter_vec!(
                "stats_api_backend_query_errors_total",
                "Metrics backend queries that failed",
                &["query"]
            )
            .expect("Failed to register backend_query_errors_total"),

            rows_returned: register_int_gauge_vec!(
                "stats_api_rows_returned",
                "Rows in the most recent summary response",
                &["operation"]
            )
            .expect("Failed to register rows_returned"),
        }
    }
}

/// Handle to the process-wide stats metrics.
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct StatMetrics {
    _private: (),
}

impl Default for StatMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl StatMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(StatMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &StatMetricsInner {
        GLOBAL_METRICS.get_or_init(StatMetricsInner::new)
    }

    pub fn observe_request(&self, operation: &str, duration_secs: f64) {
        self.inner()
            .request_duration_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    pub fn inc_request_errors(&self, operation: &str, class: &str) {
        self.inner()
            .request_errors
            .with_label_values(&[operation, class])
            .inc();
    }

    pub fn observe_backend_query(&self, query: &str, duration_secs: f64) {
        self.inner()
            .backend_query_duration_seconds
            .with_label_values(&[query])
            .observe(duration_secs);
    }

    pub fn inc_backend_query_errors(&self, query: &str) {
        self.inner()
            .backend_query_errors
            .with_label_values(&[query])
            .inc();
    }

    pub fn set_rows_returned(&self, operation: &str, rows: usize) {
        self.inner()
            .rows_returned
            .with_label_values(&[operation])
            .set(i64::try_from(rows).unwrap_or(i64::MAX));
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, listen_port: u16, prometheus_url: &str) {
        info!(
            event = "stats_api_started",
            instance = %self.instance,
            version = %version,
            listen_port = listen_port,
            prometheus_url = %prometheus_url,
            "Stats API started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "stats_api_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Stats API shutting down"
        );
    }

    /// Log a completed stat summary
    pub fn log_stat_summary(&self, target: &str, direction: &str, window: &str, rows: usize, elapsed_ms: u128) {
        info!(
            event = "stat_summary",
            instance = %self.instance,
            target = %target,
            direction = %direction,
            window = %window,
            rows = rows,
            elapsed_ms = elapsed_ms as u64,
            "Stat summary computed"
        );
    }

    pub fn log_request_failed(&self, operation: &str, class: &str, error: &str) {
        warn!(
            event = "request_failed",
            instance = %self.instance,
            operation = %operation,
            class = %class,
            error = %error,
            "Summary request failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Encoder;

    #[test]
    fn test_stat_metrics_are_exported() {
        let metrics = StatMetrics::new();
        metrics.observe_request("stat_summary", 0.02);
        metrics.inc_request_errors("stat_summary", "backend");
        metrics.observe_backend_query("latency_p99", 0.01);
        metrics.inc_backend_query_errors("latency_p99");
        metrics.set_rows_returned("stat_summary", 3);

        let mut buffer = Vec::new();
        prometheus::TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("stats_api_request_duration_seconds"));
        assert!(text.contains("stats_api_backend_query_errors_total{query=\"latency_p99\"}"));
        assert!(text.contains("stats_api_rows_returned{operation=\"stat_summary\"}"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("stats-api-0");
        assert_eq!(logger.instance, "stats-api-0");
    }
}
