//! Trailing Stop Errors

use rust_decimal::Decimal;
use thiserror::Error;

/// Validation errors raised when a job record is admitted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrailingStopError {
    /// The position has no legs.
    #[error("Job {job_id} has no legs")]
    EmptyLegs {
        /// The offending job ID.
        job_id: String,
    },

    /// A leg has a non-positive entry price.
    #[error("Leg {symbol} has invalid entry price {price}")]
    InvalidEntryPrice {
        /// Leg symbol.
        symbol: String,
        /// The rejected price.
        price: Decimal,
    },

    /// A leg has a zero quantity.
    #[error("Leg {symbol} has zero quantity")]
    InvalidQuantity {
        /// Leg symbol.
        symbol: String,
    },

    /// A risk percentage is out of range.
    #[error("Invalid {field}: {value}")]
    InvalidPercent {
        /// Parameter name.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// Anchor is not a positive aggregate price.
    #[error("Invalid anchor: {value}")]
    InvalidAnchor {
        /// The rejected value.
        value: Decimal,
    },

    /// Anchor would loosen the stop instead of tightening it.
    #[error("Anchor {anchor} is not below initial aggregate {initial_aggregate}")]
    AnchorNotTightened {
        /// The rejected anchor.
        anchor: Decimal,
        /// Sum of leg entry prices.
        initial_aggregate: Decimal,
    },
}
