//! Switchboard - an in-game telephone network
//!
//! Players carry phones with four-digit numbers. A directory on the server
//! hands out numbers and routes call messages; every client tracks each
//! phone's call state and relays the sounds around one end of a call to the
//! other, shaped to sound like a phone line.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;
