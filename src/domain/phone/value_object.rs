//! Call slot value objects

use crate::domain::phone::number::PhoneNumber;
use crate::domain::shared::value_objects::EndpointId;
use serde::{Deserialize, Serialize};

/// One of the outgoing / incoming / active slots of a phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSlot {
    pub number: PhoneNumber,
    /// Unknown for an outgoing call until the callee accepts.
    pub partner: Option<EndpointId>,
}

impl CallSlot {
    pub fn new(number: PhoneNumber, partner: Option<EndpointId>) -> Self {
        Self { number, partner }
    }
}

/// Coarse view of the slot tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneState {
    Idle,
    Dialing,
    RingingIn,
    Active,
}

impl PhoneState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhoneState::Idle => "idle",
            PhoneState::Dialing => "dialing",
            PhoneState::RingingIn => "ringing_in",
            PhoneState::Active => "active",
        }
    }
}

/// Why a phone left a call or a pending call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// We hung up an active call
    LocalHangup,
    /// We cancelled our own outgoing call
    LocalCancel,
    /// The partner hung up
    RemoteHangup,
    /// The callee hung up on our outgoing call
    Rejected,
    /// The caller gave up before we answered
    CallerGaveUp,
    /// Dialed number is not registered
    InvalidNumber,
    /// Callee already engaged
    LineBusy,
    /// Ring timeout elapsed
    Timeout,
}

impl EndReason {
    /// Whether the user hears the busy tone rather than the hangup click.
    pub fn is_failure(&self) -> bool {
        matches!(self, EndReason::InvalidNumber | EndReason::LineBusy)
    }
}

/// Full-state snapshot of a phone's slots for replica resync.
///
/// Numbers and identities use `-1` for empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallValues {
    pub outgoing: i32,
    pub incoming: i32,
    pub active: i32,
    pub incoming_caller: i64,
    pub active_caller: i64,
}

impl CallValues {
    pub const EMPTY: CallValues = CallValues {
        outgoing: -1,
        incoming: -1,
        active: -1,
        incoming_caller: -1,
        active_caller: -1,
    };

    pub fn from_slots(
        outgoing: Option<&CallSlot>,
        incoming: Option<&CallSlot>,
        active: Option<&CallSlot>,
    ) -> Self {
        Self {
            outgoing: PhoneNumber::to_sentinel(outgoing.map(|s| s.number)),
            incoming: PhoneNumber::to_sentinel(incoming.map(|s| s.number)),
            active: PhoneNumber::to_sentinel(active.map(|s| s.number)),
            incoming_caller: EndpointId::to_sentinel(incoming.and_then(|s| s.partner)),
            active_caller: EndpointId::to_sentinel(active.and_then(|s| s.partner)),
        }
    }

    pub fn outgoing_slot(&self) -> Option<CallSlot> {
        PhoneNumber::from_sentinel(self.outgoing).map(|n| CallSlot::new(n, None))
    }

    pub fn incoming_slot(&self) -> Option<CallSlot> {
        PhoneNumber::from_sentinel(self.incoming)
            .map(|n| CallSlot::new(n, EndpointId::from_sentinel(self.incoming_caller)))
    }

    pub fn active_slot(&self) -> Option<CallSlot> {
        PhoneNumber::from_sentinel(self.active)
            .map(|n| CallSlot::new(n, EndpointId::from_sentinel(self.active_caller)))
    }

    /// Numbers of every party this snapshot is bound to.
    pub fn bound_numbers(&self) -> Vec<PhoneNumber> {
        [self.outgoing, self.incoming, self.active]
            .into_iter()
            .filter_map(PhoneNumber::from_sentinel)
            .collect()
    }
}

impl Default for CallValues {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_values_round_trip_slots() {
        let active = CallSlot::new(PhoneNumber::new(42).unwrap(), Some(EndpointId::new(2)));
        let values = CallValues::from_slots(None, None, Some(&active));

        assert_eq!(values.outgoing, -1);
        assert_eq!(values.incoming, -1);
        assert_eq!(values.active, 42);
        assert_eq!(values.active_caller, 2);
        assert_eq!(values.active_slot(), Some(active));
        assert_eq!(values.incoming_slot(), None);
    }

    #[test]
    fn test_bound_numbers() {
        assert!(CallValues::EMPTY.bound_numbers().is_empty());
        let values = CallValues {
            outgoing: 12,
            ..CallValues::EMPTY
        };
        assert_eq!(values.bound_numbers(), vec![PhoneNumber::new(12).unwrap()]);
    }

    #[test]
    fn test_state_labels_match_wire_names() {
        for state in [
            PhoneState::Idle,
            PhoneState::Dialing,
            PhoneState::RingingIn,
            PhoneState::Active,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
        }
    }
}
