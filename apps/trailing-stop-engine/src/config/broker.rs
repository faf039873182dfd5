//! Broker configuration for square-offs.

use serde::{Deserialize, Serialize};

/// Broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Account square-offs are submitted under.
    #[serde(default = "default_account_id")]
    pub account_id: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            account_id: default_account_id(),
        }
    }
}

fn default_account_id() -> String {
    "paper".to_string()
}
