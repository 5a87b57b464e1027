//! Routed messages exchanged between endpoints and the directory

use crate::domain::phone::number::PhoneNumber;
use crate::domain::phone::value_object::CallValues;
use crate::domain::shared::value_objects::EndpointId;
use serde::{Deserialize, Serialize};

/// Endpoint → directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Request a number. `requested` is clamped into range; `None` picks at random.
    AllocateNumber {
        endpoint: EndpointId,
        requested: Option<i32>,
    },
    MakeOutgoingCall {
        number: PhoneNumber,
        sender: EndpointId,
    },
    AcceptIncomingCall {
        number: PhoneNumber,
        accepter: EndpointId,
    },
    HangUpCall {
        number: PhoneNumber,
        canceller: EndpointId,
    },
    /// Sent by a callee that is already engaged, addressed to the caller's number.
    LineBusy { number: PhoneNumber },
    UpdateCallValues {
        endpoint: EndpointId,
        values: CallValues,
    },
    StopRinging { endpoint: EndpointId },
    ReleaseEndpoint { endpoint: EndpointId },
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::AllocateNumber { .. } => "allocate_number",
            ServerMessage::MakeOutgoingCall { .. } => "make_outgoing_call",
            ServerMessage::AcceptIncomingCall { .. } => "accept_incoming_call",
            ServerMessage::HangUpCall { .. } => "hang_up_call",
            ServerMessage::LineBusy { .. } => "line_busy",
            ServerMessage::UpdateCallValues { .. } => "update_call_values",
            ServerMessage::StopRinging { .. } => "stop_ringing",
            ServerMessage::ReleaseEndpoint { .. } => "release_endpoint",
        }
    }
}

/// Directory → endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    NumberAssigned { number: PhoneNumber },
    NumberReleased,
    ReceiveCall {
        caller: EndpointId,
        caller_number: PhoneNumber,
    },
    CallAccepted {
        accepter: EndpointId,
        accepter_number: PhoneNumber,
    },
    HangUpCall {
        canceller: EndpointId,
        canceller_number: PhoneNumber,
    },
    LineBusy,
    InvalidCall { reason: String },
    UpdateCallValues { values: CallValues },
    StopRinging,
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::NumberAssigned { .. } => "number_assigned",
            ClientMessage::NumberReleased => "number_released",
            ClientMessage::ReceiveCall { .. } => "receive_call",
            ClientMessage::CallAccepted { .. } => "call_accepted",
            ClientMessage::HangUpCall { .. } => "hang_up_call",
            ClientMessage::LineBusy => "line_busy",
            ClientMessage::InvalidCall { .. } => "invalid_call",
            ClientMessage::UpdateCallValues { .. } => "update_call_values",
            ClientMessage::StopRinging => "stop_ringing",
        }
    }
}

/// A server message stamped with the endpoint that sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub origin: EndpointId,
    pub message: ServerMessage,
}

impl Envelope {
    pub fn new(origin: EndpointId, message: ServerMessage) -> Self {
        Self { origin, message }
    }
}

/// A client message addressed to one endpoint.
///
/// Deliveries are broadcast to every client so each replica of the target
/// applies the same transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub target: EndpointId,
    pub message: ClientMessage,
}

impl Delivery {
    pub fn new(target: EndpointId, message: ClientMessage) -> Self {
        Self { target, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_serialize_as_padded_strings() {
        let msg = ServerMessage::MakeOutgoingCall {
            number: PhoneNumber::new(42).unwrap(),
            sender: EndpointId::new(1),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "make_outgoing_call");
        assert_eq!(json["number"], "0042");
        assert_eq!(json["sender"], 1);
    }

    #[test]
    fn test_call_values_use_integer_sentinels() {
        let delivery = Delivery::new(
            EndpointId::new(3),
            ClientMessage::UpdateCallValues {
                values: CallValues {
                    active: 99,
                    active_caller: 1,
                    ..CallValues::EMPTY
                },
            },
        );
        let json = serde_json::to_value(&delivery).unwrap();
        assert_eq!(json["message"]["values"]["active"], 99);
        assert_eq!(json["message"]["values"]["outgoing"], -1);

        let decoded: Delivery = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, delivery);
    }
}
