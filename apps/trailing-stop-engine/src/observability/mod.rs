//! Observability module for metrics.
//!
//! Tracing subscriber setup lives in [`crate::telemetry`].

mod metrics;

pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_heartbeat_failure, record_patch_failure,
    record_remote_exhausted, record_remote_retry, record_tick_failure, record_tick_outcome,
    record_trail_event,
};
