//! Trailing Stop Bounded Context
//!
//! Jobs that monitor a multi-leg short-premium position against a stop
//! threshold which ratchets down as the position moves in its favor.

pub mod errors;
pub mod services;
pub mod value_objects;

pub use errors::TrailingStopError;
pub use services::ThresholdEvaluator;
pub use value_objects::{
    Anchor, Decision, Evaluation, JobRecord, Leg, OrderSide, RiskParameters, SquareOffOrder,
    SquareOffOrderType,
};
