//! Engine configuration for queue consumption and tick cadence.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Queue job generations are consumed from.
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    /// Delay before the next generation (or a re-delivery) is due.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// JSON file of seed job records.
    #[serde(default = "default_jobs_path")]
    pub jobs_path: String,
}

impl EngineConfig {
    /// Tick interval as a duration.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_name: default_queue_name(),
            tick_interval_ms: default_tick_interval_ms(),
            jobs_path: default_jobs_path(),
        }
    }
}

fn default_queue_name() -> String {
    "trailing-stops".to_string()
}

const fn default_tick_interval_ms() -> u64 {
    5_000
}

fn default_jobs_path() -> String {
    "jobs.json".to_string()
}
