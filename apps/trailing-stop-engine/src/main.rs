//! Trailing Stop Engine Binary
//!
//! Seeds job generations from a JSON file and ticks them until every job
//! resolves or the process is interrupted.
//!
//! # Usage
//!
//! ```bash
//! TRAIL_ENGINE_CONFIG=config.yaml cargo run --bin trail-engine
//! ```
//!
//! # Environment Variables
//!
//! - `TRAIL_ENGINE_CONFIG`: Config file path (default: config.yaml)
//! - `ALPACA_KEY` / `ALPACA_SECRET`: referenced from the sample config
//! - `RUST_LOG`: Overrides `observability.logging.level`

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use trailing_stop_engine::application::ports::{
    BrokerSession, EnqueueContext, PriceSourcePort, QueuePort,
};
use trailing_stop_engine::application::use_cases::EvaluateTickUseCase;
use trailing_stop_engine::config::{Config, config_path, load_config};
use trailing_stop_engine::domain::shared::QueueName;
use trailing_stop_engine::domain::trailing_stop::JobRecord;
use trailing_stop_engine::infrastructure::{
    AlpacaOptionPriceSource, InMemoryJobStore, InMemoryQueue, LocalScheduler, PaperSquareOff,
    SchedulerPorts, SessionClock,
};
use trailing_stop_engine::observability::{MetricsConfig, init_metrics};
use trailing_stop_engine::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let path = config_path();
    let config = load_config(Some(&path)).with_context(|| format!("loading {path}"))?;

    let _telemetry = init_telemetry(&config.observability).context("initializing telemetry")?;

    tracing::info!(
        config = %path,
        queue = %config.engine.queue_name,
        tick_interval_ms = config.engine.tick_interval_ms,
        "Starting trailing stop engine"
    );

    if config.observability.metrics.enabled {
        let addr = config.metrics_addr()?;
        init_metrics(&MetricsConfig::with_addr(addr)).context("starting metrics exporter")?;
    }

    let jobs = read_jobs(Path::new(&config.engine.jobs_path))?;
    let queue_name = QueueName::new(config.engine.queue_name.clone());
    let queue = Arc::new(InMemoryQueue::new());
    let store = Arc::new(InMemoryJobStore::new());

    for job in &jobs {
        store.register(job.id());
        queue
            .enqueue(
                &queue_name,
                job,
                EnqueueContext::for_job(job, std::time::Duration::ZERO),
            )
            .await
            .with_context(|| format!("seeding job {}", job.id()))?;
    }
    tracing::info!(jobs = jobs.len(), "Seeded job generations");

    let scheduler = LocalScheduler::new(
        EvaluateTickUseCase::new(config.tick_settings()),
        Arc::clone(&queue),
        queue_name,
        SchedulerPorts {
            clock: Arc::new(SessionClock::new(
                config.market_timezone()?,
                config.market_close_time()?,
            )),
            heartbeat: store.clone(),
            prices: create_price_source(&config)?,
            persistence: store,
            square_off: Arc::new(PaperSquareOff::new()),
            broker_session: BrokerSession::new(config.broker.account_id.clone()),
        },
        config.engine.tick_interval(),
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
        }
        signal_token.cancel();
    });

    let ticks = scheduler.run(shutdown).await;

    tracing::info!(ticks, "Trailing stop engine stopped");
    Ok(())
}

/// Load .env file from the current directory if present.
fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env: {e}");
        }
    }
}

fn create_price_source(config: &Config) -> anyhow::Result<Arc<dyn PriceSourcePort>> {
    let source = AlpacaOptionPriceSource::new(&config.price_feed.to_alpaca())
        .context("creating Alpaca options price source")?;
    Ok(Arc::new(source))
}

/// Read and validate seed job records.
fn read_jobs(path: &Path) -> anyhow::Result<Vec<JobRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading jobs file {}", path.display()))?;
    let jobs: Vec<JobRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing jobs file {}", path.display()))?;

    for job in &jobs {
        job.validate()
            .with_context(|| format!("invalid job {}", job.id()))?;
    }

    Ok(jobs)
}
