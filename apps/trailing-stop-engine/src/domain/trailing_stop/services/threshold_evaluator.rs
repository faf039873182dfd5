//! Threshold Evaluator Domain Service
//!
//! Pure decision function of a trailing-stop tick. Prices are aggregate
//! premiums of a net-short position, so a rising aggregate is adverse and a
//! falling aggregate is favorable.

use rust_decimal::Decimal;

use crate::domain::trailing_stop::value_objects::{Anchor, Decision, Evaluation, RiskParameters};

/// Compares a live aggregate against the ratcheting stop threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdEvaluator;

impl ThresholdEvaluator {
    /// Evaluate one tick.
    ///
    /// The stop is inclusive: `live_aggregate == active_stop` triggers.
    #[must_use]
    pub fn evaluate(
        risk: &RiskParameters,
        anchor: Option<Anchor>,
        initial_aggregate: Decimal,
        live_aggregate: Decimal,
    ) -> Evaluation {
        let initial_stop = risk.initial_stop(initial_aggregate);

        let active_stop = match (risk.trail_trigger_percent, anchor) {
            (Some(_), Some(anchor)) => risk.trailing_stop(anchor),
            _ => initial_stop,
        };

        let mut evaluation = Evaluation {
            decision: Decision::Continue,
            initial_aggregate,
            live_aggregate,
            initial_stop,
            active_stop,
            reference: None,
            pct_change: None,
        };

        if live_aggregate >= active_stop {
            evaluation.decision = Decision::Trigger;
            return evaluation;
        }

        let Some(trigger_percent) = risk.trail_trigger_percent else {
            return evaluation;
        };

        let reference = anchor.map_or(initial_aggregate, |a| a.value());
        evaluation.reference = Some(reference);

        // A zero reference has no defined percentage move.
        let Some(pct_change) = percent_change(reference, live_aggregate) else {
            return evaluation;
        };
        evaluation.pct_change = Some(pct_change);

        if pct_change < Decimal::ZERO && pct_change.abs() >= trigger_percent {
            if let Ok(new_anchor) = Anchor::new(live_aggregate) {
                evaluation.decision = Decision::Trail { new_anchor };
            }
        }

        evaluation
    }
}

fn percent_change(reference: Decimal, live: Decimal) -> Option<Decimal> {
    (live - reference)
        .checked_div(reference)
        .map(|ratio| ratio * Decimal::ONE_HUNDRED)
}
