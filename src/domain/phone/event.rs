//! Phone domain events
//!
//! Recorded by [`PhoneEndpoint`](super::PhoneEndpoint) on every transition and
//! drained by the owning client, which turns them into audible cues.

use crate::domain::phone::number::PhoneNumber;
use crate::domain::phone::value_object::EndReason;
use crate::domain::shared::events::{DomainEvent, EventMetadata};
use crate::domain::shared::value_objects::EndpointId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhoneEventKind {
    NumberAssigned {
        number: PhoneNumber,
    },
    DigitDialed {
        buffer: String,
    },
    /// Outgoing call placed, caller hears the ring-back tone
    Dialing {
        number: PhoneNumber,
    },
    /// Incoming call, the phone rings audibly
    IncomingRing {
        caller_number: PhoneNumber,
    },
    RingStopped,
    Connected {
        partner_number: PhoneNumber,
        partner: Option<EndpointId>,
    },
    Disconnected {
        number: PhoneNumber,
        reason: EndReason,
    },
    /// We were engaged and told a caller so
    BusyReplied {
        caller_number: PhoneNumber,
    },
}

/// Sound the audio engine plays for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    Ring,
    RingBack,
    StopRing,
    Pickup,
    HangupClick,
    BusyTone,
}

impl PhoneEventKind {
    pub fn cue(&self) -> Option<Cue> {
        match self {
            PhoneEventKind::IncomingRing { .. } => Some(Cue::Ring),
            PhoneEventKind::Dialing { .. } => Some(Cue::RingBack),
            PhoneEventKind::RingStopped => Some(Cue::StopRing),
            PhoneEventKind::Connected { .. } => Some(Cue::Pickup),
            PhoneEventKind::Disconnected { reason, .. } if reason.is_failure() => {
                Some(Cue::BusyTone)
            }
            PhoneEventKind::Disconnected { .. } => Some(Cue::HangupClick),
            PhoneEventKind::NumberAssigned { .. }
            | PhoneEventKind::DigitDialed { .. }
            | PhoneEventKind::BusyReplied { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneEvent {
    pub metadata: EventMetadata,
    pub endpoint: EndpointId,
    pub kind: PhoneEventKind,
}

impl PhoneEvent {
    pub fn new(endpoint: EndpointId, kind: PhoneEventKind) -> Self {
        let event_type = Self::type_name(&kind);
        Self {
            metadata: EventMetadata::new(event_type),
            endpoint,
            kind,
        }
    }

    fn type_name(kind: &PhoneEventKind) -> &'static str {
        match kind {
            PhoneEventKind::NumberAssigned { .. } => "phone.number_assigned",
            PhoneEventKind::DigitDialed { .. } => "phone.digit_dialed",
            PhoneEventKind::Dialing { .. } => "phone.dialing",
            PhoneEventKind::IncomingRing { .. } => "phone.incoming_ring",
            PhoneEventKind::RingStopped => "phone.ring_stopped",
            PhoneEventKind::Connected { .. } => "phone.connected",
            PhoneEventKind::Disconnected { .. } => "phone.disconnected",
            PhoneEventKind::BusyReplied { .. } => "phone.busy_replied",
        }
    }
}

impl DomainEvent for PhoneEvent {
    fn event_type(&self) -> &'static str {
        Self::type_name(&self.kind)
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.metadata.occurred_at
    }

    fn endpoint(&self) -> EndpointId {
        self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_follows_kind() {
        let event = PhoneEvent::new(EndpointId::new(3), PhoneEventKind::RingStopped);
        assert_eq!(event.event_type(), "phone.ring_stopped");
        assert_eq!(event.metadata.event_type, "phone.ring_stopped");
        assert_eq!(DomainEvent::endpoint(&event), EndpointId::new(3));
    }

    #[test]
    fn test_failed_calls_play_busy_tone() {
        let number = PhoneNumber::new(42).unwrap();
        let ended = |reason| PhoneEventKind::Disconnected { number, reason };

        assert_eq!(ended(EndReason::LineBusy).cue(), Some(Cue::BusyTone));
        assert_eq!(ended(EndReason::InvalidNumber).cue(), Some(Cue::BusyTone));
        assert_eq!(ended(EndReason::RemoteHangup).cue(), Some(Cue::HangupClick));
        assert_eq!(ended(EndReason::Timeout).cue(), Some(Cue::HangupClick));
        assert_eq!(
            PhoneEventKind::BusyReplied {
                caller_number: number
            }
            .cue(),
            None
        );
    }

    #[test]
    fn test_kind_serializes_tagged() {
        let kind = PhoneEventKind::DigitDialed {
            buffer: "00".to_string(),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["kind"], "digit_dialed");
        assert_eq!(json["buffer"], "00");
    }
}
