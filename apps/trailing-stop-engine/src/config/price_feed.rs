//! Price feed configuration for leg quotes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::infrastructure::price_source::{AlpacaOptionsConfig, PriceBasis, alpaca};

/// Alpaca options data configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceFeedConfig {
    /// Market data base URL.
    #[serde(default = "default_data_url")]
    pub data_url: String,
    /// API key (from environment variable).
    #[serde(default)]
    pub api_key: String,
    /// API secret (from environment variable).
    #[serde(default)]
    pub api_secret: String,
    /// Which price counts as a leg's live value.
    #[serde(default)]
    pub price_basis: PriceBasis,
    /// Options feed: "indicative" or "opra".
    #[serde(default)]
    pub feed: Option<String>,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl PriceFeedConfig {
    /// Whether credentials are present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// Adapter configuration.
    #[must_use]
    pub fn to_alpaca(&self) -> AlpacaOptionsConfig {
        AlpacaOptionsConfig {
            data_url: self.data_url.clone(),
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
            price_basis: self.price_basis,
            feed: self.feed.clone().filter(|f| !f.is_empty()),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        Self {
            data_url: default_data_url(),
            api_key: String::new(),
            api_secret: String::new(),
            price_basis: PriceBasis::default(),
            feed: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_data_url() -> String {
    alpaca::DEFAULT_DATA_URL.to_string()
}

const fn default_timeout_ms() -> u64 {
    2_000
}
