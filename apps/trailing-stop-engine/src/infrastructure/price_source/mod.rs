//! Price Source Adapters
//!
//! Implementations of `PriceSourcePort`.

pub mod alpaca;
pub mod in_memory;

pub use alpaca::{AlpacaOptionPriceSource, AlpacaOptionsConfig, PriceBasis};
pub use in_memory::InMemoryPriceSource;
