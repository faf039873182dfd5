//! Application Use Cases

mod evaluate_tick;

pub use evaluate_tick::{
    Disposition, EvaluateTickUseCase, TickError, TickOutcome, TickPorts, TickSettings,
};
