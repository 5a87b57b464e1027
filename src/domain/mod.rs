//! Domain layer - Core phone network logic
//!
//! This layer contains:
//! - directory: number allocation and routing (authoritative side only)
//! - phone: numbers, wire messages and the per-endpoint call state machine
//! - relay: ambient sound replay between the two ends of a call
//! - shaping: distance attenuation and the phone line filter
//! - shared: errors, events and value objects used everywhere

pub mod directory;
pub mod phone;
pub mod relay;
pub mod shaping;
pub mod shared;

// Re-export commonly used types
pub use shared::{DomainError, Result};
