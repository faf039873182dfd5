//! Price Source Port (Driven Port)
//!
//! Interface for reading the live price of one leg.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::shared::Symbol;

/// Price source error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PriceSourceError {
    /// Connection or transport error.
    #[error("Price source connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Upstream returned an error status.
    #[error("Price source returned status {status}: {message}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Error details.
        message: String,
    },

    /// No quote or trade for the symbol.
    #[error("No price available for {symbol}")]
    NoPrice {
        /// The symbol.
        symbol: String,
    },

    /// Response could not be decoded.
    #[error("Invalid price response: {message}")]
    InvalidResponse {
        /// Error details.
        message: String,
    },
}

/// Port for reading live leg prices.
///
/// Implementations may fail transiently; callers retry.
#[async_trait]
pub trait PriceSourcePort: Send + Sync {
    /// Current price of one instrument.
    async fn live_price(&self, symbol: &Symbol) -> Result<Decimal, PriceSourceError>;
}
