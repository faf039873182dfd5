//! Anchor Value Object

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::trailing_stop::errors::TrailingStopError;

/// Aggregate premium the trailing stop is currently re-based from.
///
/// For a net-short-premium position the anchor only ever decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Anchor(Decimal);

impl Anchor {
    /// Create an anchor from a positive aggregate price.
    pub fn new(value: Decimal) -> Result<Self, TrailingStopError> {
        if value <= Decimal::ZERO {
            return Err(TrailingStopError::InvalidAnchor { value });
        }
        Ok(Self(value))
    }

    /// Anchor value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Whether moving to `candidate` tightens the stop.
    #[must_use]
    pub fn is_ratcheted_by(&self, candidate: Self) -> bool {
        candidate.0 < self.0
    }
}

impl TryFrom<Decimal> for Anchor {
    type Error = TrailingStopError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Anchor> for Decimal {
    fn from(anchor: Anchor) -> Self {
        anchor.0
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
