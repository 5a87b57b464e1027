//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Message transports between clients and the server
//! - The in-memory audio world behind the relay ports
//! - Prometheus metrics

pub mod metrics;
pub mod transport;
pub mod world;

pub use transport::{ChannelSink, ChannelTransport, DeliverySink, Transport};
pub use world::SimulatedWorld;
