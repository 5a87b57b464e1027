//! Per-endpoint call session state machine
//!
//! Each phone keeps three slots (outgoing, incoming, active) and reconciles
//! them independently from its partner by comparing numbers. There is no
//! shared session object: if A's active partner is B, B's active partner
//! becomes A once the routed messages have been delivered.
//!
//! Local inputs (dial, accept, hang up) are guarded and return an error when
//! the guard fails. Routed messages are always accepted at this layer and
//! re-validated against the current slots, so duplicated or late messages are
//! dropped rather than applied twice.

use crate::domain::phone::dial::DialBuffer;
use crate::domain::phone::event::{PhoneEvent, PhoneEventKind};
use crate::domain::phone::message::{ClientMessage, ServerMessage};
use crate::domain::phone::number::PhoneNumber;
use crate::domain::phone::value_object::{CallSlot, CallValues, EndReason, PhoneState};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::EndpointId;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One player's phone.
///
/// Every client holds a copy of every phone. Only the copy flagged local
/// emits server messages; the others are replicas that follow routed
/// deliveries and `UpdateCallValues` snapshots.
#[derive(Debug, Clone)]
pub struct PhoneEndpoint {
    id: EndpointId,
    number: Option<PhoneNumber>,
    is_local: bool,
    open: bool,
    dial: DialBuffer,
    outgoing: Option<CallSlot>,
    incoming: Option<CallSlot>,
    active: Option<CallSlot>,
    /// When the current outgoing/incoming slot was entered
    pending_since: Option<Instant>,
    outbox: Vec<ServerMessage>,
    events: Vec<PhoneEvent>,
}

impl PhoneEndpoint {
    pub fn new(id: EndpointId, is_local: bool) -> Self {
        Self {
            id,
            number: None,
            is_local,
            open: false,
            dial: DialBuffer::new(),
            outgoing: None,
            incoming: None,
            active: None,
            pending_since: None,
            outbox: Vec::new(),
            events: Vec::new(),
        }
    }

    // ----- local input -------------------------------------------------

    /// Open or close the phone. Digits are only accepted while open.
    pub fn toggle(&mut self) -> bool {
        self.open = !self.open;
        self.open
    }

    pub fn press_digit(&mut self, digit: u8) -> Result<()> {
        if !self.open {
            return Err(DomainError::InvalidOperation("phone is closed".to_string()));
        }
        if !self.dial.push(digit) {
            return Err(DomainError::InvalidOperation(format!(
                "not a dial digit: {}",
                digit
            )));
        }

        let buffer = self.dial.as_string();
        debug!("{} dial buffer: {}", self.id, buffer);
        self.record_event(PhoneEventKind::DigitDialed { buffer });
        Ok(())
    }

    /// The pick-up button: answers a ringing phone, otherwise dials.
    pub fn call_button(&mut self, now: Instant) -> Result<()> {
        if self.incoming.is_some() {
            self.accept()
        } else {
            self.dial(now)
        }
    }

    /// Dial the number in the buffer.
    pub fn dial(&mut self, now: Instant) -> Result<()> {
        let own = self
            .number
            .ok_or_else(|| DomainError::MissingNumber(self.id.to_string()))?;

        let number = self.dial.number().ok_or_else(|| {
            DomainError::InvalidOperation(format!("not enough digits: {}", self.dial.as_string()))
        })?;

        if number == own {
            self.dial.clear();
            return Err(DomainError::InvalidOperation(
                "cannot call your own number".to_string(),
            ));
        }

        if self.outgoing.is_some() || self.active.is_some() || self.incoming.is_some() {
            return Err(DomainError::InvalidOperation("line in use".to_string()));
        }

        info!("{} dialing {}", self.id, number);
        self.outgoing = Some(CallSlot::new(number, None));
        self.pending_since = Some(now);
        self.dial.clear();
        self.emit(ServerMessage::MakeOutgoingCall {
            number,
            sender: self.id,
        });
        self.record_event(PhoneEventKind::Dialing { number });
        self.check_invariant();
        Ok(())
    }

    /// Pick up the ringing call.
    pub fn accept(&mut self) -> Result<()> {
        let slot = self
            .incoming
            .take()
            .ok_or_else(|| DomainError::InvalidOperation("no incoming call".to_string()))?;

        info!("{} picking up {}", self.id, slot.number);
        self.active = Some(slot);
        self.pending_since = None;
        self.emit(ServerMessage::AcceptIncomingCall {
            number: slot.number,
            accepter: self.id,
        });
        self.emit(ServerMessage::StopRinging { endpoint: self.id });
        self.record_event(PhoneEventKind::RingStopped);
        self.record_event(PhoneEventKind::Connected {
            partner_number: slot.number,
            partner: slot.partner,
        });
        self.check_invariant();
        Ok(())
    }

    /// Hang up the active call, or cancel the outgoing one.
    pub fn hang_up(&mut self) -> Result<()> {
        let (slot, reason) = if let Some(slot) = self.active.take() {
            (slot, EndReason::LocalHangup)
        } else if let Some(slot) = self.outgoing.take() {
            (slot, EndReason::LocalCancel)
        } else {
            return Err(DomainError::InvalidOperation(
                "nothing to hang up".to_string(),
            ));
        };

        info!("{} hanging up {} ({:?})", self.id, slot.number, reason);
        self.pending_since = None;
        self.emit(ServerMessage::HangUpCall {
            number: slot.number,
            canceller: self.id,
        });
        self.record_event(PhoneEventKind::Disconnected {
            number: slot.number,
            reason,
        });
        Ok(())
    }

    /// Give up on a pending call that has waited longer than `timeout`.
    ///
    /// Only the local phone decides; replicas learn through the resulting
    /// hang-up and the next snapshot. Returns true if a slot was cleared.
    pub fn expire_pending(&mut self, now: Instant, timeout: Duration) -> bool {
        if !self.is_local {
            return false;
        }
        let Some(since) = self.pending_since else {
            return false;
        };
        if now.saturating_duration_since(since) < timeout {
            return false;
        }

        self.pending_since = None;
        if let Some(slot) = self.outgoing.take() {
            info!("{} outgoing call to {} timed out", self.id, slot.number);
            self.emit(ServerMessage::HangUpCall {
                number: slot.number,
                canceller: self.id,
            });
            self.record_event(PhoneEventKind::Disconnected {
                number: slot.number,
                reason: EndReason::Timeout,
            });
            return true;
        }
        if let Some(slot) = self.incoming.take() {
            info!("{} incoming call from {} timed out", self.id, slot.number);
            self.emit(ServerMessage::HangUpCall {
                number: slot.number,
                canceller: self.id,
            });
            self.record_event(PhoneEventKind::RingStopped);
            self.record_event(PhoneEventKind::Disconnected {
                number: slot.number,
                reason: EndReason::Timeout,
            });
            return true;
        }
        false
    }

    // ----- routed messages ---------------------------------------------

    /// Apply a message routed to this phone by the directory.
    pub fn handle(&mut self, message: &ClientMessage, now: Instant) {
        match message {
            ClientMessage::NumberAssigned { number } => self.on_number_assigned(*number),
            ClientMessage::NumberReleased => {
                debug!("{} released its number", self.id);
                self.number = None;
            }
            ClientMessage::ReceiveCall {
                caller,
                caller_number,
            } => self.on_receive_call(*caller, *caller_number, now),
            ClientMessage::CallAccepted {
                accepter,
                accepter_number,
            } => self.on_call_accepted(*accepter, *accepter_number),
            ClientMessage::HangUpCall {
                canceller_number, ..
            } => self.on_hang_up(*canceller_number),
            ClientMessage::LineBusy => self.on_call_failed(EndReason::LineBusy),
            ClientMessage::InvalidCall { reason } => {
                debug!("{} call failed: {}", self.id, reason);
                self.on_call_failed(EndReason::InvalidNumber)
            }
            ClientMessage::UpdateCallValues { values } => {
                // The local phone is authoritative for its own slots.
                if !self.is_local {
                    self.apply_call_values(values);
                }
            }
            ClientMessage::StopRinging => self.record_event(PhoneEventKind::RingStopped),
        }
        self.check_invariant();
    }

    fn on_number_assigned(&mut self, number: PhoneNumber) {
        if self.is_local {
            info!("{} got phone number {}", self.id, number);
        }
        self.number = Some(number);
        self.record_event(PhoneEventKind::NumberAssigned { number });
    }

    fn on_receive_call(&mut self, caller: EndpointId, caller_number: PhoneNumber, now: Instant) {
        if self.incoming.map(|s| s.number) == Some(caller_number) {
            debug!("{} duplicate call from {}", self.id, caller_number);
            return;
        }

        if self.incoming.is_none() && self.active.is_none() && self.outgoing.is_none() {
            info!("{} ringing: call from {}", self.id, caller_number);
            self.incoming = Some(CallSlot::new(caller_number, Some(caller)));
            self.pending_since = Some(now);
            self.record_event(PhoneEventKind::IncomingRing { caller_number });
        } else if self.is_local {
            info!("{} busy, rejecting call from {}", self.id, caller_number);
            self.emit(ServerMessage::LineBusy {
                number: caller_number,
            });
            self.record_event(PhoneEventKind::BusyReplied { caller_number });
        }
    }

    fn on_call_accepted(&mut self, accepter: EndpointId, accepter_number: PhoneNumber) {
        if self.outgoing.map(|s| s.number) != Some(accepter_number) {
            debug!(
                "{} dropping stale accept from {} (outgoing: {:?})",
                self.id, accepter_number, self.outgoing
            );
            return;
        }

        info!("{} call accepted by {}", self.id, accepter_number);
        self.outgoing = None;
        self.pending_since = None;
        self.active = Some(CallSlot::new(accepter_number, Some(accepter)));
        self.record_event(PhoneEventKind::RingStopped);
        self.record_event(PhoneEventKind::Connected {
            partner_number: accepter_number,
            partner: Some(accepter),
        });
    }

    fn on_hang_up(&mut self, canceller_number: PhoneNumber) {
        let reason = if self.active.map(|s| s.number) == Some(canceller_number) {
            self.active = None;
            EndReason::RemoteHangup
        } else if self.outgoing.map(|s| s.number) == Some(canceller_number) {
            self.outgoing = None;
            EndReason::Rejected
        } else if self.incoming.map(|s| s.number) == Some(canceller_number) {
            self.incoming = None;
            self.record_event(PhoneEventKind::RingStopped);
            EndReason::CallerGaveUp
        } else {
            debug!(
                "{} ignoring hang up from {}: not bound to it",
                self.id, canceller_number
            );
            return;
        };

        info!("{} hung up by {} ({:?})", self.id, canceller_number, reason);
        if self.outgoing.is_none() && self.incoming.is_none() {
            self.pending_since = None;
        }
        self.record_event(PhoneEventKind::Disconnected {
            number: canceller_number,
            reason,
        });
    }

    fn on_call_failed(&mut self, reason: EndReason) {
        match self.outgoing.take() {
            Some(slot) => {
                info!("{} call to {} failed ({:?})", self.id, slot.number, reason);
                self.pending_since = None;
                self.record_event(PhoneEventKind::Disconnected {
                    number: slot.number,
                    reason,
                });
            }
            None => debug!("{} dropping {:?} with no outgoing call", self.id, reason),
        }
    }

    /// Overwrite every slot from a snapshot.
    pub fn apply_call_values(&mut self, values: &CallValues) {
        self.outgoing = values.outgoing_slot();
        self.incoming = values.incoming_slot();
        self.active = values.active_slot();
        self.pending_since = None;
    }

    // ----- accessors ---------------------------------------------------

    pub fn id(&self) -> EndpointId {
        self.id
    }

    pub fn number(&self) -> Option<PhoneNumber> {
        self.number
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn dial_buffer(&self) -> &DialBuffer {
        &self.dial
    }

    pub fn outgoing(&self) -> Option<&CallSlot> {
        self.outgoing.as_ref()
    }

    pub fn incoming(&self) -> Option<&CallSlot> {
        self.incoming.as_ref()
    }

    pub fn active(&self) -> Option<&CallSlot> {
        self.active.as_ref()
    }

    pub fn state(&self) -> PhoneState {
        if self.active.is_some() {
            PhoneState::Active
        } else if self.incoming.is_some() {
            PhoneState::RingingIn
        } else if self.outgoing.is_some() {
            PhoneState::Dialing
        } else {
            PhoneState::Idle
        }
    }

    pub fn call_values(&self) -> CallValues {
        CallValues::from_slots(
            self.outgoing.as_ref(),
            self.incoming.as_ref(),
            self.active.as_ref(),
        )
    }

    /// Number of occupied slots. Never more than one between transitions.
    pub fn occupied_slots(&self) -> usize {
        [
            self.outgoing.is_some(),
            self.incoming.is_some(),
            self.active.is_some(),
        ]
        .iter()
        .filter(|s| **s)
        .count()
    }

    pub fn take_outbox(&mut self) -> Vec<ServerMessage> {
        std::mem::take(&mut self.outbox)
    }

    pub fn take_events(&mut self) -> Vec<PhoneEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, message: ServerMessage) {
        if self.is_local {
            self.outbox.push(message);
        }
    }

    fn record_event(&mut self, kind: PhoneEventKind) {
        self.events.push(PhoneEvent::new(self.id, kind));
    }

    fn check_invariant(&self) {
        debug_assert!(
            self.occupied_slots() <= 1,
            "{} has more than one call slot occupied: {:?}",
            self.id,
            self.call_values()
        );
    }
}
