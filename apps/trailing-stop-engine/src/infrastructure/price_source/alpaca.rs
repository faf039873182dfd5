//! Alpaca options market data price source.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::{PriceSourceError, PriceSourcePort};
use crate::domain::shared::Symbol;

/// Default Alpaca market data base URL.
pub const DEFAULT_DATA_URL: &str = "https://data.alpaca.markets";

/// Which price stands for the leg's live value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBasis {
    /// Midpoint of bid and ask.
    #[default]
    Mid,
    /// Ask; the price a short leg is bought back at.
    Ask,
    /// Last trade.
    LastTrade,
}

impl FromStr for PriceBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mid" => Ok(Self::Mid),
            "ask" => Ok(Self::Ask),
            "last_trade" | "last" => Ok(Self::LastTrade),
            other => Err(format!("unknown price basis: {other}")),
        }
    }
}

/// Configuration for [`AlpacaOptionPriceSource`].
#[derive(Clone)]
pub struct AlpacaOptionsConfig {
    /// Market data base URL.
    pub data_url: String,
    /// API key.
    pub api_key: String,
    /// API secret.
    pub api_secret: String,
    /// Price basis.
    pub price_basis: PriceBasis,
    /// Options feed (`indicative` or `opra`); provider default when unset.
    pub feed: Option<String>,
    /// HTTP request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for AlpacaOptionsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlpacaOptionsConfig")
            .field("data_url", &self.data_url)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("price_basis", &self.price_basis)
            .field("feed", &self.feed)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Price source backed by Alpaca's options latest quote and trade endpoints.
#[derive(Debug, Clone)]
pub struct AlpacaOptionPriceSource {
    client: reqwest::Client,
    api_key: String,
    api_secret: String,
    data_url: String,
    price_basis: PriceBasis,
    feed: Option<String>,
}

impl AlpacaOptionPriceSource {
    /// Create a new price source.
    pub fn new(config: &AlpacaOptionsConfig) -> Result<Self, PriceSourceError> {
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(PriceSourceError::ConnectionError {
                message: "missing Alpaca API credentials".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PriceSourceError::ConnectionError {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            data_url: config.data_url.trim_end_matches('/').to_string(),
            price_basis: config.price_basis,
            feed: config.feed.clone(),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        symbol: &str,
    ) -> Result<T, PriceSourceError> {
        let url = format!("{}{path}", self.data_url);
        let mut query = vec![("symbols", symbol)];
        if let Some(feed) = &self.feed {
            query.push(("feed", feed.as_str()));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_secret)
            .send()
            .await
            .map_err(|e| PriceSourceError::ConnectionError {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PriceSourceError::Upstream {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PriceSourceError::InvalidResponse {
                message: e.to_string(),
            })
    }

    async fn latest_quote(&self, symbol: &str) -> Result<OptionQuote, PriceSourceError> {
        let mut response: LatestQuotesResponse =
            self.get("/v1beta1/options/quotes/latest", symbol).await?;
        response
            .quotes
            .remove(symbol)
            .ok_or_else(|| PriceSourceError::NoPrice {
                symbol: symbol.to_string(),
            })
    }

    async fn latest_trade(&self, symbol: &str) -> Result<OptionTrade, PriceSourceError> {
        let mut response: LatestTradesResponse =
            self.get("/v1beta1/options/trades/latest", symbol).await?;
        response
            .trades
            .remove(symbol)
            .ok_or_else(|| PriceSourceError::NoPrice {
                symbol: symbol.to_string(),
            })
    }
}

#[async_trait]
impl PriceSourcePort for AlpacaOptionPriceSource {
    async fn live_price(&self, symbol: &Symbol) -> Result<Decimal, PriceSourceError> {
        let symbol = symbol.as_str();
        let price = match self.price_basis {
            PriceBasis::Mid => {
                let quote = self.latest_quote(symbol).await?;
                if quote.bid <= Decimal::ZERO {
                    quote.ask
                } else {
                    (quote.bid + quote.ask) / Decimal::TWO
                }
            }
            PriceBasis::Ask => self.latest_quote(symbol).await?.ask,
            PriceBasis::LastTrade => self.latest_trade(symbol).await?.price,
        };

        if price <= Decimal::ZERO {
            return Err(PriceSourceError::NoPrice {
                symbol: symbol.to_string(),
            });
        }
        Ok(price)
    }
}

#[derive(Debug, Deserialize)]
struct LatestQuotesResponse {
    #[serde(default)]
    quotes: HashMap<String, OptionQuote>,
}

#[derive(Debug, Deserialize)]
struct OptionQuote {
    #[serde(rename = "bp")]
    bid: Decimal,
    #[serde(rename = "ap")]
    ask: Decimal,
}

#[derive(Debug, Deserialize)]
struct LatestTradesResponse {
    #[serde(default)]
    trades: HashMap<String, OptionTrade>,
}

#[derive(Debug, Deserialize)]
struct OptionTrade {
    #[serde(rename = "p")]
    price: Decimal,
}
