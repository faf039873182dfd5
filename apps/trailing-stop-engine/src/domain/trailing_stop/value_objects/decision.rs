//! Decision Value Objects

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Anchor;

/// Outcome of one threshold evaluation.
///
/// Abort and window-closed results never come from the evaluator; they are
/// decided before any price is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Live aggregate reached the active stop. Close the position.
    Trigger,
    /// Favorable move large enough to re-base the stop.
    Trail {
        /// Live aggregate that becomes the next anchor.
        new_anchor: Anchor,
    },
    /// Keep monitoring the same generation.
    Continue,
}

impl Decision {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Trail { .. } => "trail",
            Self::Continue => "continue",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trail { new_anchor } => write!(f, "trail(new_anchor={new_anchor})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Decision plus the intermediate values it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// The decision.
    pub decision: Decision,
    /// Sum of leg entry prices.
    pub initial_aggregate: Decimal,
    /// Sum of live leg prices.
    pub live_aggregate: Decimal,
    /// Stop derived from the initial aggregate.
    pub initial_stop: Decimal,
    /// Stop the live aggregate was compared against.
    pub active_stop: Decimal,
    /// Trailing reference (anchor or initial aggregate); `None` without trailing.
    pub reference: Option<Decimal>,
    /// Percent move from `reference`; `None` when not computed.
    pub pct_change: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decision_display() {
        assert_eq!(Decision::Trigger.to_string(), "trigger");
        assert_eq!(Decision::Continue.to_string(), "continue");
        let trail = Decision::Trail {
            new_anchor: Anchor::new(dec!(280)).unwrap(),
        };
        assert_eq!(trail.to_string(), "trail(new_anchor=280)");
        assert_eq!(trail.as_str(), "trail");
    }
}
