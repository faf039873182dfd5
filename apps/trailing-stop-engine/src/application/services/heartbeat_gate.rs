//! Heartbeat Gate Service
//!
//! Pings the job store before any price is fetched and reads the abort flag.
//! An unreachable store never blocks risk evaluation.

use crate::application::ports::HeartbeatPort;
use crate::domain::shared::JobId;
use crate::observability;
use crate::resilience::{RemoteRetryWrapper, RetryPolicy};

/// What the gate lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    /// Continue the tick.
    Proceed {
        /// Whether the heartbeat reached the store.
        heartbeat_ok: bool,
    },
    /// User asked the job to stop.
    Abort,
}

/// Retry-wrapped heartbeat plus abort check.
#[derive(Debug, Clone)]
pub struct HeartbeatGate {
    retry: RemoteRetryWrapper,
}

impl HeartbeatGate {
    /// Create a gate with the heartbeat retry policy.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self {
            retry: RemoteRetryWrapper::new(policy),
        }
    }

    /// Ping the store for `job_id` and decide whether the tick continues.
    pub async fn check(&self, heartbeat: &dyn HeartbeatPort, job_id: &JobId) -> GateVerdict {
        let result = self
            .retry
            .execute("heartbeat", job_id.as_str(), move || heartbeat.heartbeat(job_id))
            .await;

        match result {
            Ok(ack) if ack.is_abort() => {
                tracing::info!(job_id = %job_id, "Abort requested by user");
                GateVerdict::Abort
            }
            Ok(_) => GateVerdict::Proceed { heartbeat_ok: true },
            Err(e) => {
                observability::record_heartbeat_failure();
                tracing::warn!(
                    job_id = %job_id,
                    error = %e,
                    "Heartbeat failed, proceeding without abort check"
                );
                GateVerdict::Proceed {
                    heartbeat_ok: false,
                }
            }
        }
    }
}
