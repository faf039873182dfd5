//! Retry configuration for remote calls made during a tick.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::RetryPolicy;

/// Per-operation retry policies.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RetryConfig {
    /// Heartbeat/abort read.
    #[serde(default)]
    pub heartbeat: RetrySettings,
    /// Leg price fetch.
    #[serde(default)]
    pub price_fetch: RetrySettings,
    /// Trailing stop patch.
    #[serde(default)]
    pub persistence: RetrySettings,
}

/// Retry settings for one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total tries including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Initial backoff in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Maximum backoff in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Jitter factor (0.0 - 1.0).
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl RetrySettings {
    /// Convert to a [`RetryPolicy`].
    #[must_use]
    pub const fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
            self.backoff_multiplier,
            self.jitter_factor,
        )
    }
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    200
}

const fn default_max_backoff_ms() -> u64 {
    5_000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_jitter_factor() -> f64 {
    0.2
}
