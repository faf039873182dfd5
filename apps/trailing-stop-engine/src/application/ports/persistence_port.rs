//! Persistence Port (Driven Port)
//!
//! Best-effort patch of user-visible job fields.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{JobId, Timestamp};
use crate::domain::trailing_stop::Anchor;

/// Fields updated after a trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    /// Stop level that now applies to the position.
    pub live_trailing_stop: Decimal,
    /// Anchor the stop was re-based from.
    pub anchor: Anchor,
    /// Generation that carries the anchor.
    pub generation: u64,
    /// Patch time.
    pub updated_at: Timestamp,
}

/// Persistence error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PersistenceError {
    /// Store unreachable.
    #[error("Job store unavailable: {message}")]
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

/// Port for patching job fields.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Merge `patch` into the stored job.
    async fn patch(&self, job_id: &JobId, patch: JobPatch) -> Result<(), PersistenceError>;
}
