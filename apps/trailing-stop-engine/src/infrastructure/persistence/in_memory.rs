//! In-memory job store for testing and local runs.
//!
//! Serves both the heartbeat/abort flag and the trailing stop patch, the way
//! a single jobs table would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::application::ports::{
    HeartbeatAck, HeartbeatError, HeartbeatPort, JobPatch, PersistenceError, PersistencePort,
    UserOverride,
};
use crate::domain::shared::{JobId, Timestamp};
use crate::domain::trailing_stop::Anchor;

/// User-visible state of one job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredJob {
    /// Override set by the user.
    pub user_override: UserOverride,
    /// Last heartbeat received.
    pub last_heartbeat: Option<Timestamp>,
    /// Stop currently protecting the position.
    pub live_trailing_stop: Option<Decimal>,
    /// Anchor of the latest generation.
    pub anchor: Option<Anchor>,
    /// Latest patched generation.
    pub generation: u64,
    /// Last patch time.
    pub updated_at: Option<Timestamp>,
}

/// In-memory implementation of `HeartbeatPort` and `PersistencePort`.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, StoredJob>>,
    unavailable: AtomicBool,
}

impl InMemoryJobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job so heartbeats and patches are accepted.
    pub fn register(&self, job_id: &JobId) {
        self.jobs
            .write()
            .entry(job_id.to_string())
            .or_default();
    }

    /// Set the abort flag on a job.
    pub fn request_abort(&self, job_id: &JobId) -> Result<(), PersistenceError> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| PersistenceError::JobNotFound {
                job_id: job_id.to_string(),
            })?;
        job.user_override = UserOverride::Abort;
        Ok(())
    }

    /// Simulate an outage of the store.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of a job.
    #[must_use]
    pub fn get(&self, job_id: &JobId) -> Option<StoredJob> {
        self.jobs.read().get(job_id.as_str()).cloned()
    }

    fn is_unavailable(&self) -> bool {
        self.unavailable.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HeartbeatPort for InMemoryJobStore {
    async fn heartbeat(&self, job_id: &JobId) -> Result<HeartbeatAck, HeartbeatError> {
        if self.is_unavailable() {
            return Err(HeartbeatError::Unavailable {
                message: "job store offline".to_string(),
            });
        }

        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| HeartbeatError::JobNotFound {
                job_id: job_id.to_string(),
            })?;

        let now = Timestamp::now();
        job.last_heartbeat = Some(now);
        Ok(HeartbeatAck {
            user_override: job.user_override,
            recorded_at: now,
        })
    }
}

#[async_trait]
impl PersistencePort for InMemoryJobStore {
    async fn patch(&self, job_id: &JobId, patch: JobPatch) -> Result<(), PersistenceError> {
        if self.is_unavailable() {
            return Err(PersistenceError::Unavailable {
                message: "job store offline".to_string(),
            });
        }

        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(job_id.as_str())
            .ok_or_else(|| PersistenceError::JobNotFound {
                job_id: job_id.to_string(),
            })?;

        job.live_trailing_stop = Some(patch.live_trailing_stop);
        job.anchor = Some(patch.anchor);
        job.generation = patch.generation;
        job.updated_at = Some(patch.updated_at);
        Ok(())
    }
}
