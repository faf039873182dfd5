//! In-memory delayed queue for testing and local runs.
//!
//! Messages are stored as the JSON the job record serializes to, so the
//! queue exercises the same encoding a durable transport would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::application::ports::{EnqueueContext, QueueError, QueuePort};
use crate::domain::shared::{JobId, QueueName};
use crate::domain::trailing_stop::JobRecord;

#[derive(Debug, Clone)]
struct Entry {
    job_id: JobId,
    generation: u64,
    dedup_key: String,
    visible_at: Instant,
    payload: String,
}

/// A message handed to a consumer.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Decoded job generation.
    pub job: JobRecord,
    /// When the message becomes due.
    pub visible_at: Instant,
    /// De-duplication key it was enqueued with.
    pub dedup_key: String,
}

/// Named delayed queues with at most one live entry per job.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    queues: Mutex<HashMap<String, Vec<Entry>>>,
    unavailable: AtomicBool,
    accepted: AtomicUsize,
}

impl InMemoryQueue {
    /// Create an empty queue set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the entry that becomes due first.
    ///
    /// The returned entry may not be visible yet; the consumer waits for
    /// `visible_at`.
    pub fn pop_next(&self, queue: &QueueName) -> Result<Option<Delivery>, QueueError> {
        let entry = {
            let mut queues = self.queues.lock();
            let Some(entries) = queues.get_mut(queue.as_str()) else {
                return Ok(None);
            };
            let Some(index) = entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.visible_at)
                .map(|(i, _)| i)
            else {
                return Ok(None);
            };
            entries.remove(index)
        };

        let job: JobRecord =
            serde_json::from_str(&entry.payload).map_err(|e| QueueError::Serialization {
                job_id: entry.job_id.to_string(),
                message: e.to_string(),
            })?;

        Ok(Some(Delivery {
            job,
            visible_at: entry.visible_at,
            dedup_key: entry.dedup_key,
        }))
    }

    /// Number of waiting entries on `queue`.
    #[must_use]
    pub fn len(&self, queue: &QueueName) -> usize {
        self.queues
            .lock()
            .get(queue.as_str())
            .map_or(0, Vec::len)
    }

    /// Whether `queue` has no waiting entries.
    #[must_use]
    pub fn is_empty(&self, queue: &QueueName) -> bool {
        self.len(queue) == 0
    }

    /// Generation of `job_id` currently waiting on `queue`.
    #[must_use]
    pub fn live_generation(&self, queue: &QueueName, job_id: &JobId) -> Option<u64> {
        self.queues
            .lock()
            .get(queue.as_str())
            .and_then(|entries| entries.iter().find(|e| &e.job_id == job_id))
            .map(|e| e.generation)
    }

    /// Enqueues accepted since creation, repeats excluded.
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Queue a raw payload, bypassing encoding.
    #[cfg(test)]
    pub(crate) fn push_raw(&self, queue: &QueueName, job_id: JobId, payload: &str) {
        self.queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push(Entry {
                dedup_key: format!("{job_id}:0"),
                job_id,
                generation: 0,
                visible_at: Instant::now(),
                payload: payload.to_string(),
            });
    }

    /// Simulate an outage of the transport.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueuePort for InMemoryQueue {
    async fn enqueue(
        &self,
        queue: &QueueName,
        job: &JobRecord,
        context: EnqueueContext,
    ) -> Result<(), QueueError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable {
                queue: queue.to_string(),
                message: "transport offline".to_string(),
            });
        }

        let payload = serde_json::to_string(job).map_err(|e| QueueError::Serialization {
            job_id: job.id().to_string(),
            message: e.to_string(),
        })?;

        let mut queues = self.queues.lock();
        let entries = queues.entry(queue.to_string()).or_default();

        if let Some(live) = entries.iter().find(|e| &e.job_id == job.id()) {
            if live.dedup_key == context.dedup_key {
                tracing::debug!(dedup_key = %context.dedup_key, "Duplicate enqueue ignored");
                return Ok(());
            }
            return Err(QueueError::AlreadyQueued {
                job_id: job.id().to_string(),
                live_generation: live.generation,
            });
        }

        entries.push(Entry {
            job_id: job.id().clone(),
            generation: job.generation(),
            dedup_key: context.dedup_key,
            visible_at: Instant::now() + context.delay,
            payload,
        });
        self.accepted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
