//! Application layer - Use cases and application services
//!
//! This layer wires the domain to transports and the audio world:
//! - the server owning the directory
//! - clients holding handsets and driving the relay each tick
//! - the async event loop and a deterministic loopback network

pub mod client;
pub mod loopback;
pub mod runtime;
pub mod server;

pub use client::{Handset, PhoneClient, PhoneCommand, TickReport};
pub use loopback::LocalNetwork;
pub use runtime::run_client;
pub use server::PhoneServer;
