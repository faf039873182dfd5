//! Evaluate Tick Use Case
//!
//! One externally scheduled evaluation of a job generation:
//!
//! 1. market-close deadline
//! 2. heartbeat and abort flag
//! 3. concurrent live price fetch for every leg (all or nothing)
//! 4. threshold evaluation
//! 5. square-off, trail or continue
//!
//! The use case never loops. A TRAIL hands the next generation to the queue
//! and a CONTINUE fails the tick so the scheduler re-delivers the same one.

use std::fmt;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::application::ports::{
    BrokerSession, HeartbeatPort, MarketClockPort, PersistencePort, PriceSourcePort, QueueError,
    QueuePort, SquareOffPort, SquareOffReceipt,
};
use crate::application::services::{GateVerdict, HeartbeatGate, RequeueEmitter, TrailTarget};
use crate::domain::shared::QueueName;
use crate::domain::trailing_stop::{Decision, JobRecord, ThresholdEvaluator};
use crate::observability;
use crate::resilience::{RemoteRetryWrapper, RetryPolicy, TransientRemoteError};

/// Retry policies and cadence for ticks.
#[derive(Debug, Clone)]
pub struct TickSettings {
    /// Policy for the heartbeat call.
    pub heartbeat_retry: RetryPolicy,
    /// Policy for each leg's price fetch.
    pub price_retry: RetryPolicy,
    /// Policy for the trailing stop patch.
    pub persistence_retry: RetryPolicy,
    /// Delay before a successor generation becomes visible.
    pub tick_interval: Duration,
}

impl Default for TickSettings {
    fn default() -> Self {
        Self {
            heartbeat_retry: RetryPolicy::default(),
            price_retry: RetryPolicy::default(),
            persistence_retry: RetryPolicy::default(),
            tick_interval: Duration::from_secs(60),
        }
    }
}

/// Capabilities handed to one tick.
#[derive(Clone, Copy)]
pub struct TickPorts<'a> {
    /// Market-close deadline.
    pub clock: &'a dyn MarketClockPort,
    /// Heartbeat and abort flag.
    pub heartbeat: &'a dyn HeartbeatPort,
    /// Live leg prices.
    pub prices: &'a dyn PriceSourcePort,
    /// Trailing stop patch.
    pub persistence: &'a dyn PersistencePort,
    /// Successor generations.
    pub queue: &'a dyn QueuePort,
    /// Queue this generation was consumed from.
    pub queue_name: &'a QueueName,
    /// Position close-out.
    pub square_off: &'a dyn SquareOffPort,
    /// Broker session for the close-out.
    pub broker_session: &'a BrokerSession,
}

/// Terminal result of a tick. No outcome leaves the current generation live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stop re-based; the successor carries the monitoring forward.
    Trailed {
        /// Enqueued successor generation.
        successor: JobRecord,
        /// Stop that applies to the successor.
        active_stop: Decimal,
    },
    /// User requested abort.
    Aborted,
    /// Market-close deadline has passed.
    WindowClosed,
    /// Stop triggered and the close orders were submitted.
    SquaredOff(SquareOffReceipt),
    /// Stop triggered but the close-out failed.
    SquareOffFailed {
        /// Collaborator error.
        reason: String,
    },
}

impl TickOutcome {
    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trailed { .. } => "trailed",
            Self::Aborted => "aborted",
            Self::WindowClosed => "window_closed",
            Self::SquaredOff(_) => "squared_off",
            Self::SquareOffFailed { .. } => "square_off_failed",
        }
    }

    /// Whether a person has to look at the position.
    #[must_use]
    pub const fn requires_operator(&self) -> bool {
        matches!(self, Self::SquareOffFailed { .. })
    }
}

impl fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trailed {
                successor,
                active_stop,
            } => write!(
                f,
                "trailed: generation {} of job {} anchored, stop now {}",
                successor.generation(),
                successor.id(),
                active_stop
            ),
            Self::Aborted => f.write_str("aborted by user"),
            Self::WindowClosed => f.write_str("market closed, monitoring stopped"),
            Self::SquaredOff(receipt) => write!(
                f,
                "squared off: {} order(s) submitted",
                receipt.client_order_ids.len()
            ),
            Self::SquareOffFailed { reason } => write!(f, "square-off failed: {reason}"),
        }
    }
}

/// How the scheduler should treat a failed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Deliver the same, unmodified generation at the next tick.
    RetrySameGeneration,
    /// Drop the generation; another one is already live.
    Discard,
}

/// Failed tick.
#[derive(Debug, Clone, Error)]
pub enum TickError {
    /// Live aggregate is below the stop and did not trail. Benign.
    #[error("not yet triggered: live {live_aggregate} below stop {active_stop}")]
    NotYetTriggered {
        /// Sum of live leg prices.
        live_aggregate: Decimal,
        /// Stop compared against.
        active_stop: Decimal,
    },

    /// A leg price could not be fetched.
    #[error(transparent)]
    TransientRemote(#[from] TransientRemoteError),

    /// Trail decided but the successor could not be enqueued.
    #[error("trail not committed: {0}")]
    TrailNotCommitted(#[from] QueueError),
}

impl TickError {
    /// Label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotYetTriggered { .. } => "not_yet_triggered",
            Self::TransientRemote(_) => "transient_remote",
            Self::TrailNotCommitted(_) => "trail_not_committed",
        }
    }

    /// Whether this is the continue signal rather than a fault.
    #[must_use]
    pub const fn is_benign(&self) -> bool {
        matches!(self, Self::NotYetTriggered { .. })
    }

    /// What the scheduler should do with the generation.
    #[must_use]
    pub const fn disposition(&self) -> Disposition {
        match self {
            Self::TrailNotCommitted(QueueError::AlreadyQueued { .. }) => Disposition::Discard,
            _ => Disposition::RetrySameGeneration,
        }
    }
}

/// Tick orchestrator.
#[derive(Debug, Clone)]
pub struct EvaluateTickUseCase {
    gate: HeartbeatGate,
    price_retry: RemoteRetryWrapper,
    emitter: RequeueEmitter,
}

impl Default for EvaluateTickUseCase {
    fn default() -> Self {
        Self::new(TickSettings::default())
    }
}

impl EvaluateTickUseCase {
    /// Create the use case.
    #[must_use]
    pub fn new(settings: TickSettings) -> Self {
        Self {
            gate: HeartbeatGate::new(settings.heartbeat_retry),
            price_retry: RemoteRetryWrapper::new(settings.price_retry),
            emitter: RequeueEmitter::new(settings.persistence_retry, settings.tick_interval),
        }
    }

    /// Run one tick for `job`.
    ///
    /// # Errors
    ///
    /// See [`TickError`]; every variant leaves `job` unchanged for the
    /// scheduler to re-deliver or drop according to [`TickError::disposition`].
    #[tracing::instrument(
        name = "tick",
        skip_all,
        fields(
            job_id = %job.id(),
            generation = job.generation(),
            heartbeat_ok = tracing::field::Empty
        )
    )]
    pub async fn execute(
        &self,
        job: &JobRecord,
        ports: &TickPorts<'_>,
    ) -> Result<TickOutcome, TickError> {
        let started = Instant::now();
        let result = self.run(job, ports).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(outcome) if outcome.requires_operator() => {
                observability::record_tick_outcome(outcome.as_str(), elapsed);
                tracing::error!(outcome = outcome.as_str(), "{outcome}");
            }
            Ok(outcome) => {
                observability::record_tick_outcome(outcome.as_str(), elapsed);
                tracing::info!(outcome = outcome.as_str(), "{outcome}");
            }
            Err(e) if e.is_benign() => {
                observability::record_tick_failure(e.kind(), elapsed);
                tracing::debug!(reason = e.kind(), "{e}");
            }
            Err(e) => {
                observability::record_tick_failure(e.kind(), elapsed);
                tracing::warn!(reason = e.kind(), error = %e, "Tick failed");
            }
        }

        result
    }

    async fn run(&self, job: &JobRecord, ports: &TickPorts<'_>) -> Result<TickOutcome, TickError> {
        let remaining = ports.clock.time_remaining_until_close();
        if remaining < chrono::Duration::zero() {
            return Ok(TickOutcome::WindowClosed);
        }

        match self.gate.check(ports.heartbeat, job.id()).await {
            GateVerdict::Abort => return Ok(TickOutcome::Aborted),
            GateVerdict::Proceed { heartbeat_ok } => {
                tracing::Span::current().record("heartbeat_ok", heartbeat_ok);
            }
        }

        let live_aggregate = self.fetch_live_aggregate(job, ports.prices).await?;
        let evaluation = ThresholdEvaluator::evaluate(
            job.risk(),
            job.anchor(),
            job.initial_aggregate(),
            live_aggregate,
        );

        tracing::debug!(
            initial_aggregate = %evaluation.initial_aggregate,
            live_aggregate = %evaluation.live_aggregate,
            active_stop = %evaluation.active_stop,
            pct_change = ?evaluation.pct_change,
            decision = %evaluation.decision,
            "Threshold evaluated"
        );

        match evaluation.decision {
            Decision::Trigger => Ok(Self::square_off(job, ports).await),
            Decision::Trail { new_anchor } => {
                let target = TrailTarget {
                    queue: ports.queue,
                    queue_name: ports.queue_name,
                    persistence: ports.persistence,
                };
                let successor = self.emitter.emit_trail(job, new_anchor, target).await?;
                Ok(TickOutcome::Trailed {
                    active_stop: successor.risk().trailing_stop(new_anchor),
                    successor,
                })
            }
            Decision::Continue => Err(TickError::NotYetTriggered {
                live_aggregate,
                active_stop: evaluation.active_stop,
            }),
        }
    }

    async fn fetch_live_aggregate(
        &self,
        job: &JobRecord,
        prices: &dyn PriceSourcePort,
    ) -> Result<Decimal, TransientRemoteError> {
        let retry = &self.price_retry;
        let fetches = job.legs().iter().map(move |leg| {
            let symbol = leg.symbol();
            retry.execute("price_fetch", symbol.as_str(), move || {
                prices.live_price(symbol)
            })
        });

        let live = try_join_all(fetches).await?;
        Ok(live.into_iter().sum())
    }

    async fn square_off(job: &JobRecord, ports: &TickPorts<'_>) -> TickOutcome {
        let orders = job.square_off_orders();
        match ports
            .square_off
            .square_off(&orders, ports.broker_session, job)
            .await
        {
            Ok(receipt) => TickOutcome::SquaredOff(receipt),
            Err(e) => TickOutcome::SquareOffFailed {
                reason: e.to_string(),
            },
        }
    }
}
