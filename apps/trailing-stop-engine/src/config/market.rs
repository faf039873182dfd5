//! Market session configuration.

use serde::{Deserialize, Serialize};

/// Exchange session the deadline is computed against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// IANA timezone of the exchange.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Local close time, `HH:MM` or `HH:MM:SS`.
    #[serde(default = "default_close_time")]
    pub close_time: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            close_time: default_close_time(),
        }
    }
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_close_time() -> String {
    "16:00".to_string()
}
