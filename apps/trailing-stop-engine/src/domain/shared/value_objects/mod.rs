//! Shared Value Objects
//!
//! Immutable domain types used across the engine.

mod identifiers;
mod timestamp;

pub use identifiers::{ClientOrderId, JobId, QueueName, Symbol, UserId};
pub use timestamp::Timestamp;
