//! Types every part of the phone network leans on: ids, positions, the error
//! type and event metadata

pub mod error;
pub mod events;
pub mod result;
pub mod value_objects;

pub use error::DomainError;
pub use events::{DomainEvent, EventMetadata};
pub use result::Result;
pub use value_objects::{ClipId, EmitterId, EndpointId, Position};
