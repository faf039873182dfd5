//! Requeue Emitter Service
//!
//! Realizes a TRAIL decision: exactly one successor generation goes onto the
//! queue the current tick was consumed from. The user-visible trailing stop
//! patch is best-effort and never blocks the enqueue.

use std::time::Duration;

use crate::application::ports::{EnqueueContext, JobPatch, PersistencePort, QueueError, QueuePort};
use crate::domain::shared::{QueueName, Timestamp};
use crate::domain::trailing_stop::{Anchor, JobRecord};
use crate::observability;
use crate::resilience::{RemoteRetryWrapper, RetryPolicy};

/// Collaborators a trail needs.
#[derive(Clone, Copy)]
pub struct TrailTarget<'a> {
    /// Queue client.
    pub queue: &'a dyn QueuePort,
    /// Queue the current tick was consumed from.
    pub queue_name: &'a QueueName,
    /// Job store for the trailing stop patch.
    pub persistence: &'a dyn PersistencePort,
}

/// Produces successor generations.
#[derive(Debug, Clone)]
pub struct RequeueEmitter {
    patch_retry: RemoteRetryWrapper,
    tick_interval: Duration,
}

impl RequeueEmitter {
    /// Create an emitter.
    ///
    /// `tick_interval` delays the successor so it is picked up at the next
    /// tick cadence.
    #[must_use]
    pub const fn new(patch_policy: RetryPolicy, tick_interval: Duration) -> Self {
        Self {
            patch_retry: RemoteRetryWrapper::new(patch_policy),
            tick_interval,
        }
    }

    /// Enqueue the successor of `job` anchored at `new_anchor`.
    ///
    /// # Errors
    ///
    /// Returns the queue error if the successor could not be enqueued. The
    /// position is unmonitored in that case, so the error is never swallowed.
    pub async fn emit_trail(
        &self,
        job: &JobRecord,
        new_anchor: Anchor,
        target: TrailTarget<'_>,
    ) -> Result<JobRecord, QueueError> {
        let successor = job.successor(new_anchor);
        let context = EnqueueContext::for_job(&successor, self.tick_interval);

        target
            .queue
            .enqueue(target.queue_name, &successor, context)
            .await?;

        observability::record_trail_event();
        tracing::info!(
            job_id = %successor.id(),
            generation = successor.generation(),
            anchor = %new_anchor,
            queue = %target.queue_name,
            "Successor generation enqueued"
        );

        self.patch_trailing_stop(&successor, new_anchor, target.persistence)
            .await;

        Ok(successor)
    }

    async fn patch_trailing_stop(
        &self,
        successor: &JobRecord,
        anchor: Anchor,
        persistence: &dyn PersistencePort,
    ) {
        let patch = JobPatch {
            live_trailing_stop: successor.risk().trailing_stop(anchor),
            anchor,
            generation: successor.generation(),
            updated_at: Timestamp::now(),
        };
        let job_id = successor.id();

        let result = self
            .patch_retry
            .execute("persistence_patch", job_id.as_str(), move || {
                persistence.patch(job_id, patch.clone())
            })
            .await;

        if let Err(e) = result {
            observability::record_patch_failure();
            tracing::warn!(
                job_id = %job_id,
                error = %e,
                "Failed to persist trailing stop, successor already enqueued"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockPersistencePort, PersistenceError};
    use crate::domain::shared::{JobId, UserId};
    use crate::domain::trailing_stop::{Leg, RiskParameters};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    #[derive(Default)]
    struct RecordingQueue {
        fail: bool,
        enqueued: Mutex<Vec<(QueueName, JobRecord, EnqueueContext)>>,
    }

    #[async_trait]
    impl QueuePort for RecordingQueue {
        async fn enqueue(
            &self,
            queue: &QueueName,
            job: &JobRecord,
            context: EnqueueContext,
        ) -> Result<(), QueueError> {
            if self.fail {
                return Err(QueueError::Unavailable {
                    queue: queue.to_string(),
                    message: "broker down".to_string(),
                });
            }
            self.enqueued
                .lock()
                .push((queue.clone(), job.clone(), context));
            Ok(())
        }
    }

    fn job() -> JobRecord {
        JobRecord::new(
            JobId::new("job-1"),
            UserId::new("user-1"),
            vec![Leg::new("P", dec!(150)), Leg::new("C", dec!(150))],
            RiskParameters::trailing(dec!(10), Some(dec!(10)), dec!(5)),
        )
    }

    fn emitter() -> RequeueEmitter {
        RequeueEmitter::new(RetryPolicy::immediate(2), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn enqueues_exactly_one_successor() {
        let queue = RecordingQueue::default();
        let queue_name = QueueName::new("trailing-stops");
        let mut persistence = MockPersistencePort::new();
        persistence
            .expect_patch()
            .withf(|id, patch| {
                id.as_str() == "job-1"
                    && patch.live_trailing_stop == dec!(308)
                    && patch.generation == 1
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let anchor = Anchor::new(dec!(280)).unwrap();
        let successor = emitter()
            .emit_trail(
                &job(),
                anchor,
                TrailTarget {
                    queue: &queue,
                    queue_name: &queue_name,
                    persistence: &persistence,
                },
            )
            .await
            .unwrap();

        assert_eq!(successor.anchor(), Some(anchor));
        let enqueued = queue.enqueued.lock();
        assert_eq!(enqueued.len(), 1);
        let (name, record, context) = &enqueued[0];
        assert_eq!(name, &queue_name);
        assert_eq!(record, &successor);
        assert_eq!(context.delay, Duration::from_secs(60));
        assert_eq!(context.dedup_key, "job-1:1");
    }

    #[tokio::test]
    async fn patch_failure_does_not_fail_trail() {
        let queue = RecordingQueue::default();
        let queue_name = QueueName::new("trailing-stops");
        let mut persistence = MockPersistencePort::new();
        persistence.expect_patch().times(2).returning(|_, _| {
            Err(PersistenceError::Unavailable {
                message: "timeout".to_string(),
            })
        });

        let result = emitter()
            .emit_trail(
                &job(),
                Anchor::new(dec!(280)).unwrap(),
                TrailTarget {
                    queue: &queue,
                    queue_name: &queue_name,
                    persistence: &persistence,
                },
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(queue.enqueued.lock().len(), 1);
    }

    #[tokio::test]
    async fn enqueue_failure_is_propagated_and_skips_patch() {
        let queue = RecordingQueue {
            fail: true,
            ..Default::default()
        };
        let queue_name = QueueName::new("trailing-stops");
        let mut persistence = MockPersistencePort::new();
        persistence.expect_patch().never();

        let err = emitter()
            .emit_trail(
                &job(),
                Anchor::new(dec!(280)).unwrap(),
                TrailTarget {
                    queue: &queue,
                    queue_name: &queue_name,
                    persistence: &persistence,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, QueueError::Unavailable { .. }));
    }
}
