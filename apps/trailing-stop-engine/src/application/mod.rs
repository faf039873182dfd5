//! Application Layer
//!
//! Orchestrates the trailing-stop domain through driven ports.

pub mod ports;
pub mod services;
pub mod use_cases;
