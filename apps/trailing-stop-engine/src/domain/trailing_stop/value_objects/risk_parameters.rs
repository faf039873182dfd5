//! Risk Parameters Value Object

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Anchor;
use crate::domain::trailing_stop::errors::TrailingStopError;

/// Stop-loss and trailing configuration of a job.
///
/// All values are percentages (`10` means 10%). Strategies differ in which
/// optional fields they populate; a missing `trail_trigger_percent` disables
/// trailing entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskParameters {
    /// Stop distance above the initial aggregate premium.
    pub stop_percent: Decimal,
    /// Stop distance above the anchor once trailing started. Falls back to
    /// `stop_percent` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trail_percent: Option<Decimal>,
    /// Favorable move from the reference that re-bases the stop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trail_trigger_percent: Option<Decimal>,
}

impl RiskParameters {
    /// Fixed stop without trailing.
    #[must_use]
    pub const fn fixed(stop_percent: Decimal) -> Self {
        Self {
            stop_percent,
            trail_percent: None,
            trail_trigger_percent: None,
        }
    }

    /// Trailing stop.
    #[must_use]
    pub const fn trailing(
        stop_percent: Decimal,
        trail_percent: Option<Decimal>,
        trail_trigger_percent: Decimal,
    ) -> Self {
        Self {
            stop_percent,
            trail_percent,
            trail_trigger_percent: Some(trail_trigger_percent),
        }
    }

    /// Whether favorable moves re-base the stop.
    #[must_use]
    pub const fn is_trailing(&self) -> bool {
        self.trail_trigger_percent.is_some()
    }

    /// Percentage applied above the anchor.
    #[must_use]
    pub fn effective_trail_percent(&self) -> Decimal {
        self.trail_percent.unwrap_or(self.stop_percent)
    }

    /// Stop derived from the initial aggregate premium.
    #[must_use]
    pub fn initial_stop(&self, initial_aggregate: Decimal) -> Decimal {
        above(initial_aggregate, self.stop_percent)
    }

    /// Stop derived from an anchor.
    #[must_use]
    pub fn trailing_stop(&self, anchor: Anchor) -> Decimal {
        above(anchor.value(), self.effective_trail_percent())
    }

    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), TrailingStopError> {
        if self.stop_percent <= Decimal::ZERO {
            return Err(TrailingStopError::InvalidPercent {
                field: "stop_percent",
                value: self.stop_percent,
            });
        }
        if let Some(value) = self.trail_percent.filter(|v| *v <= Decimal::ZERO) {
            return Err(TrailingStopError::InvalidPercent {
                field: "trail_percent",
                value,
            });
        }
        if let Some(value) = self.trail_trigger_percent.filter(|v| *v < Decimal::ZERO) {
            return Err(TrailingStopError::InvalidPercent {
                field: "trail_trigger_percent",
                value,
            });
        }
        Ok(())
    }
}

fn above(base: Decimal, percent: Decimal) -> Decimal {
    base * (Decimal::ONE + percent / Decimal::ONE_HUNDRED)
}
