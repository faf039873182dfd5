//! Market Clock Port (Driven Port)

/// Source of the market-close deadline.
#[cfg_attr(test, mockall::automock)]
pub trait MarketClockPort: Send + Sync {
    /// Time left until the session closes. Negative once closed.
    fn time_remaining_until_close(&self) -> chrono::Duration;
}
