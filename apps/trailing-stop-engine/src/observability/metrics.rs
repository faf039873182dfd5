//! Prometheus metrics for the trailing-stop engine.
//!
//! Recording functions are no-ops until [`init_metrics`] installs the
//! exporter, so the core can call them unconditionally.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for tick duration (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl MetricsConfig {
    /// Create a metrics configuration for the given address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            // 1ms to 30s; a tick includes retried remote calls
            latency_buckets: vec![
                0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ],
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// # Errors
///
/// Returns an error if the exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Tick Metrics
// ============================================================================

/// Record a tick that resolved with a terminal outcome.
///
/// # Arguments
///
/// * `outcome` - Outcome label (e.g., "trailed", "aborted", "squared_off")
/// * `duration_seconds` - Wall time of the tick
pub fn record_tick_outcome(outcome: &'static str, duration_seconds: f64) {
    counter!("tick_outcomes_total", "outcome" => outcome).increment(1);
    histogram!("tick_duration_seconds", "result" => "resolved").record(duration_seconds);
}

/// Record a tick that failed and will be re-delivered or dropped.
///
/// # Arguments
///
/// * `reason` - Failure label (e.g., `"not_yet_triggered"`, `"transient_remote"`)
/// * `duration_seconds` - Wall time of the tick
pub fn record_tick_failure(reason: &'static str, duration_seconds: f64) {
    counter!("tick_failures_total", "reason" => reason).increment(1);
    histogram!("tick_duration_seconds", "result" => "failed").record(duration_seconds);
}

/// Record a successor generation being enqueued.
pub fn record_trail_event() {
    counter!("trail_events_total").increment(1);
}

// ============================================================================
// Remote Call Metrics
// ============================================================================

/// Record a retry of a wrapped remote call.
///
/// # Arguments
///
/// * `operation` - Operation name (e.g., "heartbeat", `"price_fetch"`)
pub fn record_remote_retry(operation: &'static str) {
    counter!("remote_call_retries_total", "operation" => operation).increment(1);
}

/// Record a wrapped remote call that exhausted its retries.
pub fn record_remote_exhausted(operation: &'static str) {
    counter!("remote_call_exhausted_total", "operation" => operation).increment(1);
}

/// Record a heartbeat that failed and was ignored.
pub fn record_heartbeat_failure() {
    counter!("heartbeat_failures_total").increment(1);
}

/// Record a best-effort trailing stop patch that failed.
pub fn record_patch_failure() {
    counter!("trailing_stop_patch_failures_total").increment(1);
}
