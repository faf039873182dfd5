//! Leg Value Object

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Symbol;
use crate::domain::trailing_stop::errors::TrailingStopError;

/// One instrument of a multi-leg position with its recorded entry price.
///
/// Immutable once the position is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    symbol: Symbol,
    entry_price: Decimal,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

impl Leg {
    /// Create a leg with a single contract.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, entry_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            entry_price,
            quantity: default_quantity(),
        }
    }

    /// Set the contract quantity used for derived square-off orders.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Instrument symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Average entry price.
    #[must_use]
    pub const fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    /// Contract quantity.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    pub(crate) fn validate(&self) -> Result<(), TrailingStopError> {
        if self.entry_price <= Decimal::ZERO {
            return Err(TrailingStopError::InvalidEntryPrice {
                symbol: self.symbol.to_string(),
                price: self.entry_price,
            });
        }
        if self.quantity == 0 {
            return Err(TrailingStopError::InvalidQuantity {
                symbol: self.symbol.to_string(),
            });
        }
        Ok(())
    }
}
