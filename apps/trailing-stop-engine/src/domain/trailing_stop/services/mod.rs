//! Trailing Stop Domain Services

mod threshold_evaluator;

pub use threshold_evaluator::ThresholdEvaluator;
