//! End-to-end tick flows through the in-memory adapters and the local
//! scheduler.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use trailing_stop_engine::application::ports::{BrokerSession, EnqueueContext, QueuePort};
use trailing_stop_engine::application::use_cases::{
    EvaluateTickUseCase, TickError, TickOutcome, TickSettings,
};
use trailing_stop_engine::domain::shared::{JobId, QueueName};
use trailing_stop_engine::domain::trailing_stop::{JobRecord, SquareOffOrderType};
use trailing_stop_engine::infrastructure::{
    InMemoryJobStore, InMemoryPriceSource, InMemoryQueue, LocalScheduler, PaperSquareOff,
    SchedulerPorts, SessionClock,
};
use trailing_stop_engine::resilience::RetryPolicy;

const PUT: &str = "SPY250117P00450000";
const CALL: &str = "SPY250117C00500000";

struct Engine {
    scheduler: LocalScheduler,
    queue: Arc<InMemoryQueue>,
    store: Arc<InMemoryJobStore>,
    prices: Arc<InMemoryPriceSource>,
    square_off: Arc<PaperSquareOff>,
}

fn queue_name() -> QueueName {
    QueueName::new("trailing-stops")
}

fn seed_jobs() -> Vec<JobRecord> {
    let raw = include_str!("fixtures/jobs.json");
    let jobs: Vec<JobRecord> = serde_json::from_str(raw).unwrap();
    for job in &jobs {
        job.validate().unwrap();
    }
    jobs
}

fn clock_at(rfc3339: &str) -> SessionClock {
    let now = DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc);
    SessionClock::new(
        chrono_tz::America::New_York,
        NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
    )
    .fixed_at(now)
}

async fn engine(jobs: &[JobRecord], clock: SessionClock) -> Engine {
    let queue = Arc::new(InMemoryQueue::new());
    let store = Arc::new(InMemoryJobStore::new());
    let prices = Arc::new(InMemoryPriceSource::new());
    let square_off = Arc::new(PaperSquareOff::new());

    for job in jobs {
        store.register(job.id());
        queue
            .enqueue(&queue_name(), job, EnqueueContext::for_job(job, Duration::ZERO))
            .await
            .unwrap();
    }

    let settings = TickSettings {
        heartbeat_retry: RetryPolicy::immediate(2),
        price_retry: RetryPolicy::immediate(2),
        persistence_retry: RetryPolicy::immediate(2),
        tick_interval: Duration::from_secs(5),
    };

    let scheduler = LocalScheduler::new(
        EvaluateTickUseCase::new(settings),
        Arc::clone(&queue),
        queue_name(),
        SchedulerPorts {
            clock: Arc::new(clock),
            heartbeat: store.clone(),
            prices: prices.clone(),
            persistence: store.clone(),
            square_off: square_off.clone(),
            broker_session: BrokerSession::new("PA-TEST"),
        },
        Duration::from_secs(5),
    );

    Engine {
        scheduler,
        queue,
        store,
        prices,
        square_off,
    }
}

fn condor() -> JobRecord {
    seed_jobs().remove(0)
}

fn set_legs(prices: &InMemoryPriceSource, put: Decimal, call: Decimal) {
    prices.set_price(PUT, put);
    prices.set_price(CALL, call);
}

#[tokio::test(start_paused = true)]
async fn trail_then_continue_then_trigger() {
    let job = condor();
    let e = engine(std::slice::from_ref(&job), clock_at("2025-01-10T17:00:00Z")).await;

    // Favorable move of 6.7% past the 5% trigger.
    set_legs(&e.prices, dec!(140), dec!(140));
    let report = e.scheduler.run_once().await.unwrap();
    let Ok(TickOutcome::Trailed {
        successor,
        active_stop,
    }) = report.result
    else {
        panic!("expected trail, got {:?}", report.result);
    };
    assert_eq!(successor.generation(), 1);
    assert_eq!(successor.anchor().map(|a| a.value()), Some(dec!(280)));
    assert_eq!(active_stop, dec!(308));

    let stored = e.store.get(job.id()).unwrap();
    assert_eq!(stored.live_trailing_stop, Some(dec!(308)));
    assert_eq!(stored.generation, 1);
    assert!(stored.last_heartbeat.is_some());

    // Back up to 300: below the 308 stop and not a new low.
    set_legs(&e.prices, dec!(150), dec!(150));
    let report = e.scheduler.run_once().await.unwrap();
    assert_eq!(report.generation, 1);
    assert!(matches!(
        report.result,
        Err(TickError::NotYetTriggered { active_stop, .. }) if active_stop == dec!(308)
    ));
    assert_eq!(
        e.queue.live_generation(&queue_name(), job.id()),
        Some(1)
    );

    // 310 breaches the trailed stop.
    set_legs(&e.prices, dec!(160), dec!(150));
    let report = e.scheduler.run_once().await.unwrap();
    assert_eq!(report.generation, 1);
    assert!(matches!(report.result, Ok(TickOutcome::SquaredOff(_))));

    let submitted = e.square_off.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].generation, 1);
    assert_eq!(submitted[0].account_id, "PA-TEST");
    assert_eq!(submitted[0].orders.len(), 2);
    assert!(e.queue.is_empty(&queue_name()));
    assert!(e.scheduler.run_once().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn explicit_square_off_instructions_are_used() {
    let strangle = seed_jobs().remove(1);
    let e = engine(
        std::slice::from_ref(&strangle),
        clock_at("2025-01-10T17:00:00Z"),
    )
    .await;
    e.prices.set_price("QQQ250117P00400000", dec!(170));
    e.prices.set_price("QQQ250117C00450000", dec!(170));

    let report = e.scheduler.run_once().await.unwrap();

    assert!(matches!(report.result, Ok(TickOutcome::SquaredOff(_))));
    let orders = &e.square_off.submitted()[0].orders;
    assert_eq!(orders.len(), 2);
    assert_eq!(
        orders[0].1.order_type,
        SquareOffOrderType::Limit {
            limit_price: dec!(2.50)
        }
    );
    assert_eq!(orders[1].1.order_type, SquareOffOrderType::Market);
    assert_eq!(orders[1].1.quantity, 2);
}

#[tokio::test(start_paused = true)]
async fn abort_stops_monitoring_without_price_fetch() {
    let job = condor();
    let e = engine(std::slice::from_ref(&job), clock_at("2025-01-10T17:00:00Z")).await;
    e.store.request_abort(job.id()).unwrap();

    let report = e.scheduler.run_once().await.unwrap();

    assert!(matches!(report.result, Ok(TickOutcome::Aborted)));
    assert_eq!(e.prices.calls(), 0);
    assert!(e.queue.is_empty(&queue_name()));
    assert!(e.square_off.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn past_close_drains_without_touching_collaborators() {
    let job = condor();
    // 16:30 EST
    let e = engine(std::slice::from_ref(&job), clock_at("2025-01-10T21:30:00Z")).await;

    let report = e.scheduler.run_once().await.unwrap();

    assert!(matches!(report.result, Ok(TickOutcome::WindowClosed)));
    assert_eq!(e.prices.calls(), 0);
    assert!(e.store.get(job.id()).unwrap().last_heartbeat.is_none());
    assert!(e.queue.is_empty(&queue_name()));
}

#[tokio::test(start_paused = true)]
async fn heartbeat_outage_does_not_block_trigger() {
    let job = condor();
    let e = engine(std::slice::from_ref(&job), clock_at("2025-01-10T17:00:00Z")).await;
    e.store.set_unavailable(true);
    set_legs(&e.prices, dec!(170), dec!(170));

    let report = e.scheduler.run_once().await.unwrap();

    assert!(matches!(report.result, Ok(TickOutcome::SquaredOff(_))));
    assert_eq!(e.square_off.submitted().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn trail_survives_store_outage_during_patch() {
    let job = condor();
    let e = engine(std::slice::from_ref(&job), clock_at("2025-01-10T17:00:00Z")).await;
    e.store.set_unavailable(true);
    set_legs(&e.prices, dec!(140), dec!(140));

    let report = e.scheduler.run_once().await.unwrap();

    assert!(matches!(report.result, Ok(TickOutcome::Trailed { .. })));
    assert_eq!(
        e.queue.live_generation(&queue_name(), job.id()),
        Some(1)
    );
    assert_eq!(e.store.get(job.id()).unwrap().live_trailing_stop, None);
}

#[tokio::test(start_paused = true)]
async fn failing_leg_redelivers_same_generation() {
    let job = condor();
    let e = engine(std::slice::from_ref(&job), clock_at("2025-01-10T17:00:00Z")).await;
    e.prices.set_price(PUT, dec!(150));
    e.prices.fail_symbol(CALL);

    let report = e.scheduler.run_once().await.unwrap();

    assert!(matches!(report.result, Err(TickError::TransientRemote(_))));
    assert_eq!(
        e.queue.live_generation(&queue_name(), &JobId::new("iron-condor-spy")),
        Some(0)
    );
    assert!(e.square_off.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn run_resolves_every_seeded_job() {
    let jobs = seed_jobs();
    let e = engine(&jobs, clock_at("2025-01-10T17:00:00Z")).await;
    set_legs(&e.prices, dec!(170), dec!(170));
    e.prices.set_price("QQQ250117P00400000", dec!(170));
    e.prices.set_price("QQQ250117C00450000", dec!(170));

    let ticks = e.scheduler.run(CancellationToken::new()).await;

    assert_eq!(ticks, 2);
    assert_eq!(e.square_off.submitted().len(), 2);
    assert_eq!(e.queue.accepted(), 2);
}
