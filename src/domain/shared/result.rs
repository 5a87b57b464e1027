//! Result alias for phone network operations

use super::error::DomainError;

/// Defaults the error side to [`DomainError`]
pub type Result<T, E = DomainError> = std::result::Result<T, E>;
