//! Application Ports (Driven)
//!
//! Interfaces a tick uses to reach external systems. Every port is passed
//! into the tick explicitly; none is a global.

mod heartbeat_port;
mod market_clock_port;
mod persistence_port;
mod price_source_port;
mod queue_port;
mod square_off_port;

pub use heartbeat_port::{HeartbeatAck, HeartbeatError, HeartbeatPort, UserOverride};
pub use market_clock_port::MarketClockPort;
pub use persistence_port::{JobPatch, PersistenceError, PersistencePort};
pub use price_source_port::{PriceSourceError, PriceSourcePort};
pub use queue_port::{EnqueueContext, QueueError, QueuePort};
pub use square_off_port::{BrokerSession, SquareOffError, SquareOffPort, SquareOffReceipt};

#[cfg(test)]
pub use heartbeat_port::MockHeartbeatPort;
#[cfg(test)]
pub use market_clock_port::MockMarketClockPort;
#[cfg(test)]
pub use persistence_port::MockPersistencePort;
