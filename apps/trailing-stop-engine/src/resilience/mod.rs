//! Resilience primitives for remote calls.

mod retry;

pub use retry::{ExponentialBackoffCalculator, RemoteRetryWrapper, RetryPolicy, TransientRemoteError};
