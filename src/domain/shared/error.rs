//! Domain errors

use thiserror::Error;

/// Errors raised by the phone network.
///
/// None of these are fatal to the process. Routing failures turn into
/// `InvalidCall`/`LineBusy` deliveries, stale messages are dropped and
/// resource races prune the affected relay entry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("No endpoint registered for number {0}")]
    RoutingFailure(String),

    #[error("Line busy: {0}")]
    LineBusy(String),

    #[error("Stale message: {0}")]
    StaleMessage(String),

    #[error("Emitter vanished during relay: {0}")]
    ResourceRace(String),

    #[error("Endpoint has no phone number: {0}")]
    MissingNumber(String),

    #[error("Directory full: all 10000 numbers are taken")]
    DirectoryFull,

    #[error("Invalid phone number: {0}")]
    InvalidNumber(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
