//! Domain Layer
//!
//! Business logic with zero infrastructure dependencies.
//!
//! # Bounded Contexts
//!
//! - [`trailing_stop`]: Job generations, risk parameters and the threshold evaluator

pub mod shared;
pub mod trailing_stop;
