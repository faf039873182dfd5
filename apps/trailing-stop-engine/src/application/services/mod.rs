//! Application Services
//!
//! Building blocks a tick is composed of.

mod heartbeat_gate;
mod requeue_emitter;

pub use heartbeat_gate::{GateVerdict, HeartbeatGate};
pub use requeue_emitter::{RequeueEmitter, TrailTarget};
