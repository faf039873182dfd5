//! Square-Off Order Value Object

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Symbol;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Buy (closes a short leg).
    Buy,
    /// Sell (closes a long leg).
    Sell,
}

/// Order type for a square-off instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SquareOffOrderType {
    /// Market order.
    Market,
    /// Limit order.
    Limit {
        /// Limit price.
        #[serde(rename = "limitPrice")]
        limit_price: Decimal,
    },
}

/// One order the square-off collaborator must place to close a leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquareOffOrder {
    /// Instrument to close.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// Contracts.
    pub quantity: u32,
    /// Order type.
    #[serde(default = "default_order_type")]
    pub order_type: SquareOffOrderType,
}

const fn default_order_type() -> SquareOffOrderType {
    SquareOffOrderType::Market
}

impl SquareOffOrder {
    /// Market buy-to-close for a short leg.
    #[must_use]
    pub const fn buy_to_close(symbol: Symbol, quantity: u32) -> Self {
        Self {
            symbol,
            side: OrderSide::Buy,
            quantity,
            order_type: SquareOffOrderType::Market,
        }
    }
}
