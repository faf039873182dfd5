//! Trailing Stop Value Objects

mod anchor;
mod decision;
mod job_record;
mod leg;
mod risk_parameters;
mod square_off;

pub use anchor::Anchor;
pub use decision::{Decision, Evaluation};
pub use job_record::JobRecord;
pub use leg::Leg;
pub use risk_parameters::RiskParameters;
pub use square_off::{OrderSide, SquareOffOrder, SquareOffOrderType};
