//! Job Record
//!
//! One generation of a monitored position. The record is the queue message:
//! a tick reads it, never mutates it, and a TRAIL produces a successor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Anchor, Leg, RiskParameters, SquareOffOrder};
use crate::domain::shared::{JobId, UserId};
use crate::domain::trailing_stop::errors::TrailingStopError;

/// State threaded across ticks for one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    id: JobId,
    user_id: UserId,
    legs: Vec<Leg>,
    risk: RiskParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    anchor: Option<Anchor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    square_off_instructions: Option<Vec<SquareOffOrder>>,
    #[serde(default)]
    generation: u64,
}

impl JobRecord {
    /// Create the generation-zero record for a freshly opened position.
    #[must_use]
    pub const fn new(id: JobId, user_id: UserId, legs: Vec<Leg>, risk: RiskParameters) -> Self {
        Self {
            id,
            user_id,
            legs,
            risk,
            anchor: None,
            square_off_instructions: None,
            generation: 0,
        }
    }

    /// Set the anchor.
    #[must_use]
    pub const fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Set explicit square-off instructions.
    #[must_use]
    pub fn with_square_off_instructions(mut self, orders: Vec<SquareOffOrder>) -> Self {
        self.square_off_instructions = Some(orders);
        self
    }

    /// Job ID.
    #[must_use]
    pub const fn id(&self) -> &JobId {
        &self.id
    }

    /// Owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Legs in entry order.
    #[must_use]
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Risk parameters.
    #[must_use]
    pub const fn risk(&self) -> &RiskParameters {
        &self.risk
    }

    /// Current anchor, if the stop was ever re-based.
    #[must_use]
    pub const fn anchor(&self) -> Option<Anchor> {
        self.anchor
    }

    /// Generation counter (0 at position open).
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Sum of leg entry prices.
    #[must_use]
    pub fn initial_aggregate(&self) -> Decimal {
        self.legs.iter().map(Leg::entry_price).sum()
    }

    /// Orders that close the position.
    ///
    /// Explicit instructions win; otherwise every leg is bought back at market.
    #[must_use]
    pub fn square_off_orders(&self) -> Vec<SquareOffOrder> {
        self.square_off_instructions.clone().unwrap_or_else(|| {
            self.legs
                .iter()
                .map(|leg| SquareOffOrder::buy_to_close(leg.symbol().clone(), leg.quantity()))
                .collect()
        })
    }

    /// Next generation: same identity, anchor replaced.
    ///
    /// `new_anchor` must sit strictly below the current anchor, or below the
    /// initial aggregate for an unanchored record.
    #[must_use]
    pub fn successor(&self, new_anchor: Anchor) -> Self {
        debug_assert!(
            self.anchor.map_or(new_anchor.value() < self.initial_aggregate(), |current| {
                current.is_ratcheted_by(new_anchor)
            }),
            "successor anchor {new_anchor} does not tighten the stop"
        );
        Self {
            anchor: Some(new_anchor),
            generation: self.generation + 1,
            ..self.clone()
        }
    }

    /// Queue de-duplication key for this generation.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.id, self.generation)
    }

    /// Validate the record at admission.
    pub fn validate(&self) -> Result<(), TrailingStopError> {
        if self.legs.is_empty() {
            return Err(TrailingStopError::EmptyLegs {
                job_id: self.id.to_string(),
            });
        }
        for leg in &self.legs {
            leg.validate()?;
        }
        self.risk.validate()?;

        // Anchor positivity holds by construction, including when deserialized.
        if let Some(anchor) = self.anchor {
            let initial_aggregate = self.initial_aggregate();
            if anchor.value() >= initial_aggregate {
                return Err(TrailingStopError::AnchorNotTightened {
                    anchor: anchor.value(),
                    initial_aggregate,
                });
            }
        }

        Ok(())
    }
}
