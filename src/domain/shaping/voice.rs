//! Phone effect on the call partner's live voice channel

use super::filter::PhoneFilter;
use super::rack::{FilterComponent, FilterKind, FilterRack, MixSettings};
use crate::domain::shared::value_objects::EmitterId;
use tracing::debug;

pub const VOICE_PAN_ALIVE: f32 = 0.4;
pub const VOICE_LOW_PASS_RESONANCE: f32 = 3.0;

/// Tracks which voice channel currently carries the phone effect.
#[derive(Debug, Default)]
pub struct PhoneVoice {
    snapshot: Option<PhoneFilter>,
}

impl PhoneVoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engaged(&self) -> Option<EmitterId> {
        self.snapshot.as_ref().map(PhoneFilter::emitter)
    }

    /// Put the phone effect on `voice`. Safe to call every tick; the
    /// snapshot is only taken on first touch. Switching to another voice
    /// channel restores the previous one first.
    pub fn engage<R: FilterRack + ?Sized>(
        &mut self,
        rack: &mut R,
        voice: EmitterId,
        listener_alive: bool,
    ) -> bool {
        if self.engaged().is_some_and(|current| current != voice) {
            self.release(rack);
        }

        if self.snapshot.is_none() {
            let Some(snapshot) = PhoneFilter::capture(&*rack, voice) else {
                return false;
            };
            debug!("Phone voice effect on {}", voice);
            self.snapshot = Some(snapshot);
        }

        let Some(current) = rack.mix_settings(voice) else {
            return false;
        };
        rack.set_mix_settings(
            voice,
            MixSettings {
                spatial_blend: 0.0,
                two_d: true,
                pan: if listener_alive { VOICE_PAN_ALIVE } else { 0.0 },
                ..current
            },
        );

        let low_pass = match rack
            .component(voice, FilterKind::LowPass)
            .unwrap_or_else(|| FilterComponent::fresh(FilterKind::LowPass))
        {
            FilterComponent::LowPass { cutoff, .. } => FilterComponent::LowPass {
                enabled: true,
                cutoff,
                resonance: VOICE_LOW_PASS_RESONANCE,
            },
            other => other,
        };
        rack.set_component(voice, low_pass);

        let high_pass = match rack
            .component(voice, FilterKind::HighPass)
            .unwrap_or_else(|| FilterComponent::fresh(FilterKind::HighPass))
        {
            FilterComponent::HighPass {
                cutoff, resonance, ..
            } => FilterComponent::HighPass {
                enabled: true,
                cutoff,
                resonance,
            },
            other => other,
        };
        rack.set_component(voice, high_pass);

        if rack.occlusion(voice).is_some() {
            rack.set_occlusion(voice, false);
        }
        true
    }

    /// Restore the voice channel. No-op when nothing is engaged.
    pub fn release<R: FilterRack + ?Sized>(&mut self, rack: &mut R) {
        if let Some(snapshot) = self.snapshot.take() {
            snapshot.restore(rack);
        }
    }
}
