//! Relay engine
//!
//! Each handset runs two halves of the relay:
//! - discovery: as the recording side, collect sounds playing near its own phone
//!   into the qualified list
//! - mirroring: as the listening side, replay the partner's qualified sources
//!   through shadow emitters attached to its own phone
//!
//! The listener reads a snapshot of the partner's qualified list once per
//! tick. Sources it prunes are handed back so the partner can drop them.

use super::entry::RelayEntry;
use super::ports::{AudioWorld, EmitterSource, EmitterState, PlayerRoster, ShadowMixer, SpatialQuery};
use super::settings::{DistanceReference, RelaySettings};
use crate::domain::shaping::filter::PhoneFilter;
use crate::domain::shaping::profile::{shadow_gain, FilterProfile};
use crate::domain::shaping::rolloff::clamp01;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::value_objects::{EmitterId, EndpointId};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

/// Overrun below which a shadow starts just before the clip end
pub const OVERRUN_TOLERANCE: f32 = 0.05;
/// Larger overruns restart at `elapsed / OVERRUN_DIVISOR`
pub const OVERRUN_DIVISOR: f32 = 5.0;

/// Start offset for a shadow of a source at `elapsed` into a clip of
/// `clip_length` seconds. Never past the end of the clip for small overruns.
pub fn seed_offset(elapsed: f32, clip_length: f32) -> f32 {
    if elapsed < clip_length {
        elapsed
    } else if elapsed - OVERRUN_TOLERANCE < clip_length {
        (elapsed - OVERRUN_TOLERANCE).max(0.0)
    } else {
        elapsed / OVERRUN_DIVISOR
    }
}

/// What one mirroring pass changed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MirrorReport {
    /// Sources that got a new shadow
    pub spawned: Vec<EmitterId>,
    /// Sources dropped; the recording side must forget them
    pub pruned: Vec<EmitterId>,
}

pub struct RelayEngine {
    owner: EndpointId,
    settings: RelaySettings,
    profile: FilterProfile,
    /// Sources discovered around this handset's phone
    qualified: Vec<EmitterId>,
    /// Sources replayed on this handset, keyed by source
    receiving: HashMap<EmitterId, RelayEntry>,
    last_sweep: Option<Instant>,
}

impl RelayEngine {
    pub fn new(owner: EndpointId, settings: RelaySettings, profile: FilterProfile) -> Self {
        Self {
            owner,
            settings,
            profile,
            qualified: Vec::new(),
            receiving: HashMap::new(),
            last_sweep: None,
        }
    }

    pub fn owner(&self) -> EndpointId {
        self.owner
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    pub fn qualified(&self) -> &[EmitterId] {
        &self.qualified
    }

    pub fn entry(&self, source: EmitterId) -> Option<&RelayEntry> {
        self.receiving.get(&source)
    }

    pub fn entries(&self) -> impl Iterator<Item = &RelayEntry> {
        self.receiving.values()
    }

    pub fn len(&self) -> usize {
        self.receiving.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiving.is_empty()
    }

    /// Linear falloff from `max_volume` at the phone to silence at
    /// `recording_range + 3`.
    pub fn relay_volume(&self, distance: f32) -> f32 {
        self.settings.max_volume * (1.0 - clamp01(distance / self.settings.falloff_distance()))
    }

    /// Collect sounds playing around this handset's phone.
    ///
    /// Relay emitters are skipped so shadows never get picked up again.
    /// Returns how many sources were added.
    pub fn discover<W>(&mut self, world: &W) -> usize
    where
        W: SpatialQuery + EmitterSource + PlayerRoster + ?Sized,
    {
        let Some(center) = world.position_of(self.owner) else {
            return 0;
        };

        let mut added = 0;
        for id in world.emitters_within(center, self.settings.recording_range) {
            let Some(state) = world.emitter(id) else {
                continue;
            };
            if state.is_relay || !qualifies(&state) || self.qualified.contains(&id) {
                continue;
            }
            debug!("{} picked up {} ({:?})", self.owner, id, state.clip);
            self.qualified.push(id);
            added += 1;
        }
        added
    }

    /// Replay `partner_qualified` on this handset.
    ///
    /// Distances are measured from this handset's phone unless the settings
    /// ask for the recording partner's.
    pub fn mirror<W>(
        &mut self,
        world: &mut W,
        partner: EndpointId,
        partner_qualified: &[EmitterId],
    ) -> MirrorReport
    where
        W: AudioWorld + ?Sized,
    {
        let mut report = MirrorReport::default();
        let reference = match self.settings.distance_reference {
            DistanceReference::Recorder => world.position_of(partner),
            DistanceReference::Listener => world.position_of(self.owner),
        };

        for source in partner_qualified.iter().copied() {
            let Some(state) = world.emitter(source) else {
                debug!("{}", DomainError::ResourceRace(source.to_string()));
                self.drop_entry(world, source);
                report.pruned.push(source);
                continue;
            };

            let distance = reference
                .map(|position| position.distance(&state.position))
                .unwrap_or(f32::INFINITY);

            if distance > self.settings.prune_distance() {
                debug!(
                    "{} out of range ({:.1}), dropping relay on {}",
                    source, distance, self.owner
                );
                self.drop_entry(world, source);
                report.pruned.push(source);
                continue;
            }

            let gain = shadow_gain(
                self.relay_volume(distance),
                &state.rolloff,
                distance,
                state.base_volume,
            );

            if !self.receiving.contains_key(&source) {
                if self.spawn(world, &state, gain, distance) {
                    report.spawned.push(source);
                }
                continue;
            }

            self.update(world, &state, gain, distance);
        }

        report
    }

    fn spawn<W: AudioWorld + ?Sized>(
        &mut self,
        world: &mut W,
        source: &EmitterState,
        gain: f32,
        distance: f32,
    ) -> bool {
        let Some(clip) = source.clip.clone() else {
            return false;
        };

        let shadow = match world.spawn_shadow(self.owner, &clip) {
            Ok(shadow) => shadow,
            Err(e) => {
                warn!("Could not relay {} on {}: {}", source.id, self.owner, e);
                return false;
            }
        };
        let Some(filter) = PhoneFilter::capture(&*world, shadow) else {
            world.destroy(shadow);
            return false;
        };

        filter.install(world);
        filter.apply(world, gain, &self.profile);
        let offset = seed_offset(source.elapsed, source.clip_length);
        world.seek(shadow, offset);
        world.play(shadow);
        debug!("{} relaying {} through {}", self.owner, source.id, shadow);

        let mut entry = RelayEntry::new(source.id, shadow, clip, filter);
        entry.volume = gain;
        entry.last_offset = offset;
        entry.last_distance = distance;
        self.receiving.insert(source.id, entry);
        true
    }

    fn update<W: AudioWorld + ?Sized>(
        &mut self,
        world: &mut W,
        source: &EmitterState,
        gain: f32,
        distance: f32,
    ) {
        let Some(shadow_id) = self.receiving.get(&source.id).map(|entry| entry.shadow) else {
            return;
        };
        let Some(shadow) = world.emitter(shadow_id) else {
            // Shadow destroyed under us; respawned next tick.
            debug!("{} lost shadow {}", self.owner, shadow_id);
            self.receiving.remove(&source.id);
            return;
        };
        let Some(entry) = self.receiving.get_mut(&source.id) else {
            return;
        };

        entry.filter.apply(world, gain, &self.profile);
        entry.volume = gain;
        entry.last_distance = distance;

        let clip_changed = source.clip != shadow.clip;
        if (source.playing && !shadow.playing) || clip_changed {
            if let Some(clip) = &source.clip {
                world.set_clip(entry.shadow, clip);
                entry.clip = clip.clone();
                world.play(entry.shadow);
            }
        } else if !source.playing {
            world.stop(entry.shadow);
        }

        entry.last_offset = seed_offset(source.elapsed, source.clip_length);
        world.seek(entry.shadow, entry.last_offset);
    }

    fn drop_entry<W: ShadowMixer + ?Sized>(&mut self, world: &mut W, source: EmitterId) {
        if let Some(entry) = self.receiving.remove(&source) {
            world.destroy(entry.shadow);
        }
    }

    /// Remove sources the listening side has pruned.
    pub fn forget(&mut self, sources: &[EmitterId]) {
        self.qualified.retain(|id| !sources.contains(id));
    }

    /// Periodically destroy entries whose source no longer exists.
    ///
    /// Runs at most once per cleanup interval and only when the table has
    /// grown past the threshold. Returns how many entries were removed.
    pub fn sweep<W>(&mut self, world: &mut W, now: Instant) -> usize
    where
        W: EmitterSource + ShadowMixer + ?Sized,
    {
        let due = match self.last_sweep {
            Some(last) => now.saturating_duration_since(last) >= self.settings.cleanup_interval(),
            None => true,
        };
        if !due {
            return 0;
        }
        self.last_sweep = Some(now);

        if self.receiving.len() <= self.settings.cleanup_threshold {
            return 0;
        }

        let dead: Vec<EmitterId> = self
            .receiving
            .keys()
            .copied()
            .filter(|source| !world.is_alive(*source))
            .collect();
        for source in &dead {
            self.drop_entry(world, *source);
        }
        self.forget(&dead);

        if !dead.is_empty() {
            debug!("{} swept {} dead relay entries", self.owner, dead.len());
        }
        dead.len()
    }

    /// Destroy every shadow and clear the qualified list. Called when the
    /// handset's call ends.
    pub fn teardown<W: ShadowMixer + ?Sized>(&mut self, world: &mut W) -> usize {
        let count = self.receiving.len();
        for (_, entry) in self.receiving.drain() {
            world.destroy(entry.shadow);
        }
        self.qualified.clear();

        if count > 0 {
            debug!("{} tore down {} relay entries", self.owner, count);
        }
        count
    }
}

fn qualifies(state: &EmitterState) -> bool {
    state.playing && state.clip.is_some() && state.elapsed > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RelayEngine {
        RelayEngine::new(
            EndpointId::new(1),
            RelaySettings::default(),
            FilterProfile::default(),
        )
    }

    #[test]
    fn test_seed_offset_in_bounds() {
        assert_eq!(seed_offset(1.5, 3.0), 1.5);
    }

    #[test]
    fn test_seed_offset_small_overrun() {
        assert!((seed_offset(3.02, 3.0) - 2.97).abs() < 1e-5);
        assert_eq!(seed_offset(0.03, 0.0), 0.0);
    }

    #[test]
    fn test_seed_offset_large_overrun() {
        assert!((seed_offset(10.0, 3.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_relay_volume_monotonic() {
        let engine = engine();
        assert!((engine.relay_volume(0.0) - 0.6).abs() < 1e-6);
        assert_eq!(engine.relay_volume(9.0), 0.0);

        let mut previous = engine.relay_volume(0.0);
        let mut d = 0.0;
        while d <= 9.0 {
            let v = engine.relay_volume(d);
            assert!(v <= previous + 1e-6, "volume rose at {}", d);
            previous = v;
            d += 0.25;
        }
    }

    #[test]
    fn test_forget_removes_from_qualified() {
        let mut engine = engine();
        engine.qualified = vec![EmitterId::new(1), EmitterId::new(2)];
        engine.forget(&[EmitterId::new(1)]);
        assert_eq!(engine.qualified(), &[EmitterId::new(2)]);
    }
}
