//! Heartbeat Port (Driven Port)
//!
//! Liveness ping for a job plus the externally controlled abort flag.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{JobId, Timestamp};

/// Override a user placed on a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserOverride {
    /// Keep monitoring.
    #[default]
    None,
    /// Stop monitoring without closing the position.
    Abort,
}

/// Result of a heartbeat call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatAck {
    /// Override currently set on the job.
    pub user_override: UserOverride,
    /// When the store recorded the heartbeat.
    pub recorded_at: Timestamp,
}

impl HeartbeatAck {
    /// Acknowledgement without an override.
    #[must_use]
    pub fn alive() -> Self {
        Self {
            user_override: UserOverride::None,
            recorded_at: Timestamp::now(),
        }
    }

    /// Acknowledgement carrying an abort request.
    #[must_use]
    pub fn abort() -> Self {
        Self {
            user_override: UserOverride::Abort,
            recorded_at: Timestamp::now(),
        }
    }

    /// Whether the job was asked to stop.
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(self.user_override, UserOverride::Abort)
    }
}

/// Heartbeat error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HeartbeatError {
    /// Store unreachable.
    #[error("Heartbeat store unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Job unknown to the store.
    #[error("Job not found: {job_id}")]
    JobNotFound {
        /// The job ID.
        job_id: String,
    },
}

/// Port for the heartbeat/abort store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HeartbeatPort: Send + Sync {
    /// Record liveness and read back the current override.
    async fn heartbeat(&self, job_id: &JobId) -> Result<HeartbeatAck, HeartbeatError>;
}
