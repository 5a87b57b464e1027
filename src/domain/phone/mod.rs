//! Phone bounded context - numbers, call slots and the per-endpoint state machine

pub mod dial;
pub mod endpoint;
pub mod event;
pub mod message;
pub mod number;
pub mod value_object;

pub use dial::DialBuffer;
pub use endpoint::PhoneEndpoint;
pub use event::{Cue, PhoneEvent, PhoneEventKind};
pub use message::{ClientMessage, Delivery, Envelope, ServerMessage};
pub use number::PhoneNumber;
pub use value_object::{CallSlot, CallValues, EndReason, PhoneState};
