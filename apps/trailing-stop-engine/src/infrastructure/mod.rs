//! Infrastructure Layer
//!
//! Adapters implementing the application ports, and the local scheduler
//! that drives ticks from a queue.

pub mod clock;
pub mod persistence;
pub mod price_source;
pub mod queue;
pub mod scheduler;
pub mod square_off;

pub use clock::SessionClock;
pub use persistence::InMemoryJobStore;
pub use price_source::{AlpacaOptionPriceSource, AlpacaOptionsConfig, InMemoryPriceSource, PriceBasis};
pub use queue::{Delivery, InMemoryQueue};
pub use scheduler::{LocalScheduler, SchedulerPorts, TickReport};
pub use square_off::{PaperSquareOff, SubmittedSquareOff};
