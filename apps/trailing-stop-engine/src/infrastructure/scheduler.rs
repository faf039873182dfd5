//! Local tick scheduler.
//!
//! Drives [`EvaluateTickUseCase`] from an [`InMemoryQueue`]: pops the next
//! due generation, runs one tick, and applies the failure disposition.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::queue::{Delivery, InMemoryQueue};
use crate::application::ports::{
    BrokerSession, EnqueueContext, HeartbeatPort, MarketClockPort, PersistencePort,
    PriceSourcePort, QueuePort, SquareOffPort,
};
use crate::application::use_cases::{
    Disposition, EvaluateTickUseCase, TickError, TickOutcome, TickPorts,
};
use crate::domain::shared::{JobId, QueueName};
use crate::domain::trailing_stop::JobRecord;

/// Collaborators shared by every tick.
#[derive(Clone)]
pub struct SchedulerPorts {
    /// Market-close clock.
    pub clock: Arc<dyn MarketClockPort>,
    /// Heartbeat/abort store.
    pub heartbeat: Arc<dyn HeartbeatPort>,
    /// Leg price source.
    pub prices: Arc<dyn PriceSourcePort>,
    /// Job record store.
    pub persistence: Arc<dyn PersistencePort>,
    /// Square-off collaborator.
    pub square_off: Arc<dyn SquareOffPort>,
    /// Session for square-offs.
    pub broker_session: BrokerSession,
}

/// Result of one delivered tick.
#[derive(Debug)]
pub struct TickReport {
    /// Job ticked.
    pub job_id: JobId,
    /// Generation ticked.
    pub generation: u64,
    /// Tick result.
    pub result: Result<TickOutcome, TickError>,
}

/// What one pass over the queue produced.
enum Step {
    Ticked(TickReport),
    Dropped,
    Idle,
}

/// Single-consumer scheduler over an in-memory queue.
pub struct LocalScheduler {
    use_case: EvaluateTickUseCase,
    queue: Arc<InMemoryQueue>,
    queue_name: QueueName,
    ports: SchedulerPorts,
    redelivery_delay: Duration,
}

impl LocalScheduler {
    /// Create a scheduler.
    ///
    /// `redelivery_delay` is how long a generation waits before it is
    /// delivered again after a failed tick.
    #[must_use]
    pub fn new(
        use_case: EvaluateTickUseCase,
        queue: Arc<InMemoryQueue>,
        queue_name: QueueName,
        ports: SchedulerPorts,
        redelivery_delay: Duration,
    ) -> Self {
        Self {
            use_case,
            queue,
            queue_name,
            ports,
            redelivery_delay,
        }
    }

    /// Deliver and tick the next generation, waiting until it is due.
    ///
    /// Entries that cannot be decoded are dropped and skipped. Returns
    /// `None` when the queue is empty.
    pub async fn run_once(&self) -> Option<TickReport> {
        let shutdown = CancellationToken::new();
        loop {
            match self.tick_next(&shutdown).await {
                Step::Ticked(report) => return Some(report),
                Step::Dropped => {}
                Step::Idle => return None,
            }
        }
    }

    /// Tick until the queue drains or `shutdown` fires.
    ///
    /// Returns the number of ticks run.
    pub async fn run(&self, shutdown: CancellationToken) -> usize {
        let mut ticks = 0;
        tracing::info!(queue = %self.queue_name, "Scheduler started");

        while !shutdown.is_cancelled() {
            match self.tick_next(&shutdown).await {
                Step::Ticked(_) => ticks += 1,
                Step::Dropped => {}
                Step::Idle => break,
            }
        }

        tracing::info!(
            queue = %self.queue_name,
            ticks,
            waiting = self.queue.len(&self.queue_name),
            "Scheduler stopped"
        );
        ticks
    }

    async fn tick_next(&self, shutdown: &CancellationToken) -> Step {
        let delivery = match self.queue.pop_next(&self.queue_name) {
            Ok(Some(delivery)) => delivery,
            Ok(None) => return Step::Idle,
            Err(e) => {
                // Undecodable payloads cannot be ticked.
                tracing::error!(queue = %self.queue_name, error = %e, "Dropping queue entry");
                return Step::Dropped;
            }
        };
        let Some(job) = self.wait_until_due(delivery, shutdown).await else {
            return Step::Idle;
        };

        let ports = TickPorts {
            clock: self.ports.clock.as_ref(),
            heartbeat: self.ports.heartbeat.as_ref(),
            prices: self.ports.prices.as_ref(),
            persistence: self.ports.persistence.as_ref(),
            queue: self.queue.as_ref(),
            queue_name: &self.queue_name,
            square_off: self.ports.square_off.as_ref(),
            broker_session: &self.ports.broker_session,
        };
        let result = self.use_case.execute(&job, &ports).await;

        if let Err(e) = &result {
            self.apply_disposition(&job, e).await;
        }

        Step::Ticked(TickReport {
            job_id: job.id().clone(),
            generation: job.generation(),
            result,
        })
    }

    /// Wait for `delivery` to become due, restoring it on shutdown.
    async fn wait_until_due(
        &self,
        delivery: Delivery,
        shutdown: &CancellationToken,
    ) -> Option<JobRecord> {
        tokio::select! {
            () = tokio::time::sleep_until(delivery.visible_at) => Some(delivery.job),
            () = shutdown.cancelled() => {
                let delay = delivery.visible_at.saturating_duration_since(Instant::now());
                self.requeue(&delivery.job, delay).await;
                None
            }
        }
    }

    async fn apply_disposition(&self, job: &JobRecord, error: &TickError) {
        match error.disposition() {
            Disposition::RetrySameGeneration => {
                self.requeue(job, self.redelivery_delay).await;
            }
            Disposition::Discard => {
                tracing::info!(
                    job_id = %job.id(),
                    generation = job.generation(),
                    "Discarding superseded generation"
                );
            }
        }
    }

    async fn requeue(&self, job: &JobRecord, delay: Duration) {
        let context = EnqueueContext::for_job(job, delay);
        if let Err(e) = self.queue.enqueue(&self.queue_name, job, context).await {
            tracing::error!(
                job_id = %job.id(),
                generation = job.generation(),
                error = %e,
                "Failed to re-deliver generation"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::TickSettings;
    use crate::domain::shared::UserId;
    use crate::domain::trailing_stop::{Leg, RiskParameters};
    use crate::infrastructure::persistence::InMemoryJobStore;
    use crate::infrastructure::price_source::InMemoryPriceSource;
    use crate::infrastructure::square_off::PaperSquareOff;
    use crate::resilience::RetryPolicy;
    use rust_decimal_macros::dec;

    struct OpenMarket;

    impl MarketClockPort for OpenMarket {
        fn time_remaining_until_close(&self) -> chrono::Duration {
            chrono::Duration::hours(2)
        }
    }

    struct Fixture {
        scheduler: LocalScheduler,
        queue: Arc<InMemoryQueue>,
        prices: Arc<InMemoryPriceSource>,
        square_off: Arc<PaperSquareOff>,
    }

    fn queue_name() -> QueueName {
        QueueName::new("trailing-stops")
    }

    fn job() -> JobRecord {
        JobRecord::new(
            JobId::new("job-1"),
            UserId::new("user-1"),
            vec![Leg::new("PUT", dec!(1.00)), Leg::new("CALL", dec!(1.00))],
            RiskParameters::fixed(dec!(10)),
        )
    }

    async fn fixture() -> Fixture {
        let queue = Arc::new(InMemoryQueue::new());
        let store = Arc::new(InMemoryJobStore::new());
        let prices = Arc::new(InMemoryPriceSource::new());
        let square_off = Arc::new(PaperSquareOff::new());
        let job = job();
        store.register(job.id());
        prices.set_price("PUT", dec!(1.00));
        prices.set_price("CALL", dec!(1.00));

        queue
            .enqueue(&queue_name(), &job, EnqueueContext::for_job(&job, Duration::ZERO))
            .await
            .unwrap();

        let settings = TickSettings {
            heartbeat_retry: RetryPolicy::no_retry(),
            price_retry: RetryPolicy::no_retry(),
            persistence_retry: RetryPolicy::no_retry(),
            tick_interval: Duration::from_secs(5),
        };
        let scheduler = LocalScheduler::new(
            EvaluateTickUseCase::new(settings),
            Arc::clone(&queue),
            queue_name(),
            SchedulerPorts {
                clock: Arc::new(OpenMarket),
                heartbeat: store.clone(),
                prices: prices.clone(),
                persistence: store,
                square_off: square_off.clone(),
                broker_session: BrokerSession::new("PA1"),
            },
            Duration::from_secs(5),
        );

        Fixture {
            scheduler,
            queue,
            prices,
            square_off,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn continue_redelivers_same_generation() {
        let f = fixture().await;

        let report = f.scheduler.run_once().await.unwrap();

        assert!(matches!(report.result, Err(TickError::NotYetTriggered { .. })));
        assert_eq!(
            f.queue.live_generation(&queue_name(), &JobId::new("job-1")),
            Some(0)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_drains_queue() {
        let f = fixture().await;
        f.prices.set_price("PUT", dec!(1.50));

        let report = f.scheduler.run_once().await.unwrap();

        assert!(matches!(report.result, Ok(TickOutcome::SquaredOff(_))));
        assert!(f.queue.is_empty(&queue_name()));
        assert_eq!(f.square_off.submitted().len(), 1);
        assert!(f.scheduler.run_once().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_price_fetch_is_retried_next_tick() {
        let f = fixture().await;
        f.prices.fail_symbol("CALL");

        let report = f.scheduler.run_once().await.unwrap();
        assert!(matches!(report.result, Err(TickError::TransientRemote(_))));

        f.prices.clear_failure("CALL");
        f.prices.set_price("CALL", dec!(1.30));
        let started = Instant::now();
        let report = f.scheduler.run_once().await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(report.generation, 0);
        assert!(matches!(report.result, Ok(TickOutcome::SquaredOff(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_restores_waiting_generation() {
        let f = fixture().await;
        // First tick continues and re-delivers five seconds out.
        f.scheduler.run_once().await.unwrap();

        let shutdown = CancellationToken::new();
        let stopper = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            stopper.cancel();
        });

        let ticks = f.scheduler.run(shutdown).await;

        assert_eq!(ticks, 0);
        assert_eq!(f.queue.len(&queue_name()), 1);
    }

    /// Put an undecodable entry ahead of the fixture job.
    async fn corrupt_head(f: &Fixture) {
        let waiting = f.queue.pop_next(&queue_name()).unwrap().unwrap();
        f.queue
            .push_raw(&queue_name(), JobId::new("job-bad"), r#"{"id":"job-bad","legs":"#);
        f.queue
            .enqueue(
                &queue_name(),
                &waiting.job,
                EnqueueContext::for_job(&waiting.job, Duration::ZERO),
            )
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_entry_does_not_stop_run() {
        let f = fixture().await;
        f.prices.set_price("PUT", dec!(1.50));
        corrupt_head(&f).await;
        assert_eq!(f.queue.len(&queue_name()), 2);

        let ticks = f.scheduler.run(CancellationToken::new()).await;

        assert_eq!(ticks, 1);
        assert_eq!(f.square_off.submitted().len(), 1);
        assert!(f.queue.is_empty(&queue_name()));
    }

    #[tokio::test(start_paused = true)]
    async fn run_once_skips_undecodable_entry() {
        let f = fixture().await;
        corrupt_head(&f).await;

        let report = f.scheduler.run_once().await.unwrap();

        assert_eq!(report.job_id, JobId::new("job-1"));
        assert!(matches!(report.result, Err(TickError::NotYetTriggered { .. })));
    }
}
