//! Phone client
//!
//! A client holds one handset per endpoint it knows about: its own (local)
//! plus replicas of everyone else. Deliveries from the server are applied to
//! the matching handset; only the local handset produces outgoing messages.
//!
//! Every tick runs, in order:
//! 1. ring timeout on the local phone
//! 2. relay discovery for every handset in a call, teardown for the rest
//! 3. relay mirroring against a snapshot of each partner's qualified list,
//!    then pruned sources are handed back to the partner
//! 4. the periodic relay cleanup sweep
//! 5. the phone effect on the local call partner's voice

use crate::config::Config;
use crate::domain::phone::endpoint::PhoneEndpoint;
use crate::domain::phone::event::PhoneEvent;
use crate::domain::phone::message::{ClientMessage, Delivery, Envelope, ServerMessage};
use crate::domain::phone::value_object::CallValues;
use crate::domain::relay::engine::RelayEngine;
use crate::domain::relay::ports::AudioWorld;
use crate::domain::relay::settings::RelaySettings;
use crate::domain::shaping::profile::FilterProfile;
use crate::domain::shaping::voice::PhoneVoice;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{EmitterId, EndpointId};
use crate::infrastructure::metrics;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A phone as seen by one client: call session plus relay.
pub struct Handset {
    pub endpoint: PhoneEndpoint,
    pub relay: RelayEngine,
}

impl Handset {
    fn new(id: EndpointId, is_local: bool, settings: &RelaySettings, profile: FilterProfile) -> Self {
        Self {
            endpoint: PhoneEndpoint::new(id, is_local),
            relay: RelayEngine::new(id, settings.clone(), profile),
        }
    }

    /// Partner of the active call, if connected
    pub fn partner(&self) -> Option<EndpointId> {
        self.endpoint.active().and_then(|slot| slot.partner)
    }
}

/// Local input on the client's own phone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneCommand {
    Toggle,
    Digit(u8),
    CallButton,
    HangUp,
    RequestNumber(Option<i32>),
}

/// What a tick did
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub discovered: usize,
    pub spawned: usize,
    pub pruned: usize,
    pub swept: usize,
    pub torn_down: usize,
    pub expired: bool,
}

pub struct PhoneClient<W: AudioWorld> {
    local: EndpointId,
    handsets: BTreeMap<EndpointId, Handset>,
    world: W,
    voice: PhoneVoice,
    relay_settings: RelaySettings,
    profile: FilterProfile,
    ring_timeout: Option<Duration>,
    pending: Vec<ServerMessage>,
    last_broadcast: CallValues,
}

impl<W: AudioWorld> PhoneClient<W> {
    pub fn new(local: EndpointId, world: W, config: &Config) -> Self {
        let profile = FilterProfile::for_quality(config.shaping.call_quality);
        let mut handsets = BTreeMap::new();
        handsets.insert(local, Handset::new(local, true, &config.relay, profile));

        Self {
            local,
            handsets,
            world,
            voice: PhoneVoice::new(),
            relay_settings: config.relay.clone(),
            profile,
            ring_timeout: config.ring_timeout(),
            pending: Vec::new(),
            last_broadcast: CallValues::EMPTY,
        }
    }

    pub fn local_id(&self) -> EndpointId {
        self.local
    }

    pub fn local(&self) -> Option<&PhoneEndpoint> {
        self.handsets.get(&self.local).map(|h| &h.endpoint)
    }

    pub fn handset(&self, id: EndpointId) -> Option<&Handset> {
        self.handsets.get(&id)
    }

    pub fn handsets(&self) -> impl Iterator<Item = &Handset> {
        self.handsets.values()
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn voice_engaged(&self) -> Option<EmitterId> {
        self.voice.engaged()
    }

    // ----- local input -------------------------------------------------

    pub fn request_number(&mut self, requested: Option<i32>) {
        self.pending.push(ServerMessage::AllocateNumber {
            endpoint: self.local,
            requested,
        });
    }

    pub fn execute(&mut self, command: PhoneCommand, now: Instant) -> Result<()> {
        if let PhoneCommand::RequestNumber(requested) = command {
            self.request_number(requested);
            return Ok(());
        }

        let Some(handset) = self.handsets.get_mut(&self.local) else {
            return Ok(());
        };
        let phone = &mut handset.endpoint;
        match command {
            PhoneCommand::Toggle => {
                if phone.toggle() {
                    match phone.number() {
                        Some(number) => info!("Phone opened! Your number is: {}", number),
                        None => info!("Phone opened! No number yet"),
                    }
                } else {
                    info!("Phone closed!");
                }
                Ok(())
            }
            PhoneCommand::Digit(digit) => phone.press_digit(digit),
            PhoneCommand::CallButton => phone.call_button(now),
            PhoneCommand::HangUp => phone.hang_up(),
            PhoneCommand::RequestNumber(_) => Ok(()),
        }
    }

    /// Dial a full number string, digit by digit, then press call.
    pub fn dial(&mut self, digits: &str, now: Instant) -> Result<()> {
        for c in digits.chars() {
            let digit = c.to_digit(10).map(|d| d as u8).unwrap_or(u8::MAX);
            self.execute(PhoneCommand::Digit(digit), now)?;
        }
        self.execute(PhoneCommand::CallButton, now)
    }

    // ----- routed messages ---------------------------------------------

    /// Apply a broadcast delivery to the handset it targets.
    pub fn apply(&mut self, delivery: &Delivery, now: Instant) {
        let target = delivery.target;

        if matches!(delivery.message, ClientMessage::NumberReleased) && target != self.local {
            if let Some(mut handset) = self.handsets.remove(&target) {
                handset.relay.teardown(&mut self.world);
                debug!("Dropped replica {}", target);
            }
            return;
        }

        let (settings, profile) = (&self.relay_settings, self.profile);
        let handset = self
            .handsets
            .entry(target)
            .or_insert_with(|| Handset::new(target, false, settings, profile));
        handset.endpoint.handle(&delivery.message, now);
    }

    /// Messages to send to the server: queued requests, the local phone's
    /// outbox, then a snapshot of its slots if they changed.
    pub fn flush(&mut self) -> Vec<Envelope> {
        let mut messages = std::mem::take(&mut self.pending);

        if let Some(handset) = self.handsets.get_mut(&self.local) {
            messages.extend(handset.endpoint.take_outbox());
            let values = handset.endpoint.call_values();
            if values != self.last_broadcast {
                self.last_broadcast = values;
                messages.push(ServerMessage::UpdateCallValues {
                    endpoint: self.local,
                    values,
                });
            }
        }

        messages
            .into_iter()
            .map(|message| Envelope::new(self.local, message))
            .collect()
    }

    /// Drain events of the local phone. Replica events are discarded.
    pub fn take_events(&mut self) -> Vec<PhoneEvent> {
        let mut events = Vec::new();
        for (id, handset) in self.handsets.iter_mut() {
            let drained = handset.endpoint.take_events();
            if *id == self.local {
                events = drained;
            }
        }
        events
    }

    // ----- tick --------------------------------------------------------

    pub fn tick(&mut self, now: Instant) -> TickReport {
        let timer = metrics::Timer::new();
        let mut report = TickReport::default();

        if let (Some(timeout), Some(handset)) = (self.ring_timeout, self.handsets.get_mut(&self.local)) {
            report.expired = handset.endpoint.expire_pending(now, timeout);
        }

        for handset in self.handsets.values_mut() {
            if handset.endpoint.active().is_some() {
                report.discovered += handset.relay.discover(&self.world);
            } else {
                report.torn_down += handset.relay.teardown(&mut self.world);
            }
        }

        let snapshots: HashMap<EndpointId, Vec<EmitterId>> = self
            .handsets
            .iter()
            .map(|(id, handset)| (*id, handset.relay.qualified().to_vec()))
            .collect();

        let mut forgotten: Vec<(EndpointId, Vec<EmitterId>)> = Vec::new();
        for handset in self.handsets.values_mut() {
            let Some(partner) = handset.partner() else {
                continue;
            };
            let Some(qualified) = snapshots.get(&partner) else {
                continue;
            };

            let mirrored = handset.relay.mirror(&mut self.world, partner, qualified);
            report.spawned += mirrored.spawned.len();
            report.pruned += mirrored.pruned.len();
            if !mirrored.pruned.is_empty() {
                forgotten.push((partner, mirrored.pruned));
            }
        }
        for (partner, pruned) in forgotten {
            if let Some(handset) = self.handsets.get_mut(&partner) {
                handset.relay.forget(&pruned);
            }
        }

        for handset in self.handsets.values_mut() {
            report.swept += handset.relay.sweep(&mut self.world, now);
        }

        self.update_voice();

        let entries: usize = self.handsets.values().map(|h| h.relay.len()).sum();
        metrics::update_relay_entries(&self.local.to_string(), entries);
        metrics::record_relay_pruned(report.pruned + report.swept);
        metrics::record_tick(timer.elapsed());

        report
    }

    fn update_voice(&mut self) {
        let partner_voice = self
            .handsets
            .get(&self.local)
            .and_then(Handset::partner)
            .and_then(|partner| self.world.voice_emitter(partner));

        match partner_voice {
            Some(voice) => {
                let alive = self.world.is_player_alive(self.local);
                self.voice.engage(&mut self.world, voice, alive);
            }
            None => self.voice.release(&mut self.world),
        }
    }

    /// Leave the network: tear down every relay, restore the voice channel
    /// and tell the server to release our number.
    pub fn leave(&mut self) -> Envelope {
        for handset in self.handsets.values_mut() {
            handset.relay.teardown(&mut self.world);
        }
        self.voice.release(&mut self.world);
        Envelope::new(
            self.local,
            ServerMessage::ReleaseEndpoint {
                endpoint: self.local,
            },
        )
    }
}
