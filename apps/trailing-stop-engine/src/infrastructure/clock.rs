//! Exchange session clock.

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::application::ports::MarketClockPort;

type NowFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Market-close deadline of an exchange session in its local timezone.
#[derive(Clone)]
pub struct SessionClock {
    timezone: Tz,
    close_time: NaiveTime,
    now: NowFn,
}

impl std::fmt::Debug for SessionClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClock")
            .field("timezone", &self.timezone)
            .field("close_time", &self.close_time)
            .finish_non_exhaustive()
    }
}

impl SessionClock {
    /// Clock reading wall time.
    #[must_use]
    pub fn new(timezone: Tz, close_time: NaiveTime) -> Self {
        Self {
            timezone,
            close_time,
            now: Arc::new(Utc::now),
        }
    }

    /// Replace the time source.
    #[must_use]
    pub fn with_now(mut self, now: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.now = Arc::new(now);
        self
    }

    /// Clock frozen at `instant`.
    #[must_use]
    pub fn fixed_at(mut self, instant: DateTime<Utc>) -> Self {
        self.now = Arc::new(move || instant);
        self
    }

    /// Close of the session on the exchange-local date of `now`.
    fn close_on_day_of(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local_date = now.with_timezone(&self.timezone).date_naive();
        self.timezone
            .from_local_datetime(&local_date.and_time(self.close_time))
            .earliest()
            .map(|close| close.with_timezone(&Utc))
    }
}

impl MarketClockPort for SessionClock {
    fn time_remaining_until_close(&self) -> chrono::Duration {
        let now = (self.now)();
        // A close time inside a DST gap does not exist that day; treat as closed.
        self.close_on_day_of(now)
            .map_or_else(|| chrono::Duration::seconds(-1), |close| close - now)
    }
}
