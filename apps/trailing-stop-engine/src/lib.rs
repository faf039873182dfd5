// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Trailing Stop Engine - Rust Core Library
//!
//! Tick-driven trailing stop-loss for multi-leg short options positions.
//! Each tick evaluates one immutable job generation and ends in exactly one
//! of: square-off, a single successor generation, or a benign "not yet".
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: job records, risk parameters, anchors and the pure
//!   `ThresholdEvaluator`
//!
//! - **Application**: the tick orchestrator and its building blocks
//!   - `ports`: price source, heartbeat, persistence, queue, market clock, square-off
//!   - `services`: `HeartbeatGate`, `RequeueEmitter`
//!   - `use_cases`: `EvaluateTickUseCase`
//!
//! - **Resilience**: `RemoteRetryWrapper` with exponential backoff and jitter
//!
//! - **Infrastructure**: Alpaca price source, in-memory store and queue,
//!   session clock, paper square-off, and the `LocalScheduler`
//!
//! # Coverage
//!
//! Coverage threshold: 90% (Critical tier)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// YAML configuration with environment interpolation.
pub mod config;

/// Prometheus metrics.
pub mod observability;

/// Retry with exponential backoff for remote calls.
pub mod resilience;

/// Tracing subscriber and OpenTelemetry setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::shared::{ClientOrderId, JobId, QueueName, Symbol, Timestamp, UserId};
pub use domain::trailing_stop::{
    Anchor, Decision, Evaluation, JobRecord, Leg, RiskParameters, SquareOffOrder,
    ThresholdEvaluator, TrailingStopError,
};

// Application re-exports
pub use application::ports::{
    BrokerSession, HeartbeatPort, MarketClockPort, PersistencePort, PriceSourcePort, QueuePort,
    SquareOffPort,
};
pub use application::use_cases::{
    Disposition, EvaluateTickUseCase, TickError, TickOutcome, TickPorts, TickSettings,
};

// Infrastructure re-exports
pub use infrastructure::{
    AlpacaOptionPriceSource, InMemoryJobStore, InMemoryPriceSource, InMemoryQueue,
    LocalScheduler, PaperSquareOff, SchedulerPorts, SessionClock,
};
pub use resilience::{RemoteRetryWrapper, RetryPolicy};
