//! Queue Port (Driven Port)
//!
//! Durable delayed queue carrying job generations between ticks.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::shared::QueueName;
use crate::domain::trailing_stop::JobRecord;

/// Delivery options for an enqueued generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueContext {
    /// Delay before the generation becomes visible to consumers.
    pub delay: Duration,
    /// Key that makes a repeated enqueue of the same generation idempotent.
    pub dedup_key: String,
}

impl EnqueueContext {
    /// Context for the given generation with a delivery delay.
    #[must_use]
    pub fn for_job(job: &JobRecord, delay: Duration) -> Self {
        Self {
            delay,
            dedup_key: job.dedup_key(),
        }
    }
}

/// Queue error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// Another generation of the job is already waiting.
    #[error("Job {job_id} already has generation {live_generation} queued")]
    AlreadyQueued {
        /// The job ID.
        job_id: String,
        /// Generation already waiting.
        live_generation: u64,
    },

    /// Queue unreachable.
    #[error("Queue {queue} unavailable: {message}")]
    Unavailable {
        /// Queue name.
        queue: String,
        /// Error details.
        message: String,
    },

    /// Job could not be encoded as a message.
    #[error("Failed to serialize job {job_id}: {message}")]
    Serialization {
        /// The job ID.
        job_id: String,
        /// Error details.
        message: String,
    },
}

/// Port for enqueueing job generations.
#[async_trait]
pub trait QueuePort: Send + Sync {
    /// Enqueue one generation on the named queue.
    async fn enqueue(
        &self,
        queue: &QueueName,
        job: &JobRecord,
        context: EnqueueContext,
    ) -> Result<(), QueueError>;
}
