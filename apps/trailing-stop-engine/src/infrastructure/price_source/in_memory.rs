//! In-memory price source for testing and local runs.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::application::ports::{PriceSourceError, PriceSourcePort};
use crate::domain::shared::Symbol;

/// Price source holding settable prices.
#[derive(Debug, Default)]
pub struct InMemoryPriceSource {
    prices: RwLock<HashMap<String, Decimal>>,
    failing: RwLock<HashSet<String>>,
    calls: AtomicUsize,
}

impl InMemoryPriceSource {
    /// Create an empty price source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the price for a symbol.
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.write().insert(symbol.to_string(), price);
    }

    /// Make every fetch of `symbol` fail until cleared.
    pub fn fail_symbol(&self, symbol: &str) {
        self.failing.write().insert(symbol.to_string());
    }

    /// Stop failing `symbol`.
    pub fn clear_failure(&self, symbol: &str) {
        self.failing.write().remove(symbol);
    }

    /// Fetches served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSourcePort for InMemoryPriceSource {
    async fn live_price(&self, symbol: &Symbol) -> Result<Decimal, PriceSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.read().contains(symbol.as_str()) {
            return Err(PriceSourceError::ConnectionError {
                message: format!("injected failure for {symbol}"),
            });
        }

        self.prices
            .read()
            .get(symbol.as_str())
            .copied()
            .ok_or_else(|| PriceSourceError::NoPrice {
                symbol: symbol.to_string(),
            })
    }
}
