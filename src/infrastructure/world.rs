//! In-memory audio world
//!
//! Stands in for a game's audio engine: players carrying phones, sound
//! emitters with playback state, and the filter components attached to them.

use crate::domain::relay::ports::{EmitterSource, EmitterState, PlayerRoster, ShadowMixer, SpatialQuery};
use crate::domain::shaping::rack::{FilterComponent, FilterKind, FilterRack, MixSettings};
use crate::domain::shaping::rolloff::RolloffModel;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{ClipId, EmitterId, EndpointId, Position};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct SimEmitter {
    state: EmitterState,
    mix: MixSettings,
    components: HashMap<FilterKind, FilterComponent>,
    occlusion: Option<bool>,
    /// Player whose phone carries this emitter
    host: Option<EndpointId>,
}

#[derive(Debug, Clone)]
struct SimPlayer {
    position: Position,
    alive: bool,
    voice: EmitterId,
}

#[derive(Debug, Default)]
pub struct SimulatedWorld {
    emitters: HashMap<EmitterId, SimEmitter>,
    players: HashMap<EndpointId, SimPlayer>,
    clips: HashMap<ClipId, f32>,
    next_id: u64,
}

impl SimulatedWorld {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> EmitterId {
        self.next_id += 1;
        EmitterId::new(self.next_id)
    }

    pub fn register_clip(&mut self, clip: ClipId, length: f32) {
        self.clips.insert(clip, length);
    }

    fn clip_length(&self, clip: &ClipId) -> f32 {
        self.clips.get(clip).copied().unwrap_or(0.0)
    }

    // ----- players -----------------------------------------------------

    /// Add a player and its voice channel. Returns the voice emitter.
    pub fn add_player(&mut self, endpoint: EndpointId, position: Position) -> EmitterId {
        let voice = self.allocate_id();
        let mut components = HashMap::new();
        components.insert(
            FilterKind::LowPass,
            FilterComponent::LowPass {
                enabled: false,
                cutoff: 5000.0,
                resonance: 1.0,
            },
        );
        components.insert(
            FilterKind::HighPass,
            FilterComponent::HighPass {
                enabled: false,
                cutoff: 10.0,
                resonance: 1.0,
            },
        );

        self.emitters.insert(
            voice,
            SimEmitter {
                state: EmitterState {
                    id: voice,
                    position,
                    playing: false,
                    clip: None,
                    clip_length: 0.0,
                    elapsed: 0.0,
                    base_volume: 1.0,
                    rolloff: RolloffModel::default(),
                    is_relay: false,
                },
                mix: MixSettings::default(),
                components,
                occlusion: Some(true),
                host: Some(endpoint),
            },
        );
        self.players.insert(
            endpoint,
            SimPlayer {
                position,
                alive: true,
                voice,
            },
        );
        voice
    }

    /// Move a player. Its voice and any shadows on its phone move along.
    pub fn move_player(&mut self, endpoint: EndpointId, position: Position) {
        let Some(player) = self.players.get_mut(&endpoint) else {
            return;
        };
        player.position = position;
        for emitter in self.emitters.values_mut() {
            if emitter.host == Some(endpoint) {
                emitter.state.position = position;
            }
        }
    }

    pub fn set_player_alive(&mut self, endpoint: EndpointId, alive: bool) {
        if let Some(player) = self.players.get_mut(&endpoint) {
            player.alive = alive;
        }
    }

    /// Remove a player together with everything its phone carries.
    pub fn remove_player(&mut self, endpoint: EndpointId) {
        self.players.remove(&endpoint);
        self.emitters.retain(|_, emitter| emitter.host != Some(endpoint));
    }

    // ----- sounds ------------------------------------------------------

    /// Add a sound already playing `clip` from the start.
    pub fn add_sound(&mut self, position: Position, clip: ClipId) -> EmitterId {
        let id = self.allocate_id();
        let clip_length = self.clip_length(&clip);
        self.emitters.insert(
            id,
            SimEmitter {
                state: EmitterState {
                    id,
                    position,
                    playing: true,
                    clip: Some(clip),
                    clip_length,
                    elapsed: 0.0,
                    base_volume: 1.0,
                    rolloff: RolloffModel::default(),
                    is_relay: false,
                },
                mix: MixSettings::default(),
                components: HashMap::new(),
                occlusion: None,
                host: None,
            },
        );
        id
    }

    pub fn remove_emitter(&mut self, id: EmitterId) {
        self.emitters.remove(&id);
    }

    pub fn move_emitter(&mut self, id: EmitterId, position: Position) {
        if let Some(emitter) = self.emitters.get_mut(&id) {
            emitter.state.position = position;
        }
    }

    pub fn set_playing(&mut self, id: EmitterId, playing: bool) {
        if let Some(emitter) = self.emitters.get_mut(&id) {
            emitter.state.playing = playing;
        }
    }

    pub fn set_elapsed(&mut self, id: EmitterId, elapsed: f32) {
        if let Some(emitter) = self.emitters.get_mut(&id) {
            emitter.state.elapsed = elapsed;
        }
    }

    pub fn set_sound_clip(&mut self, id: EmitterId, clip: ClipId) {
        let clip_length = self.clip_length(&clip);
        if let Some(emitter) = self.emitters.get_mut(&id) {
            emitter.state.clip = Some(clip);
            emitter.state.clip_length = clip_length;
        }
    }

    pub fn set_base_volume(&mut self, id: EmitterId, volume: f32) {
        if let Some(emitter) = self.emitters.get_mut(&id) {
            emitter.state.base_volume = volume;
        }
    }

    pub fn set_rolloff(&mut self, id: EmitterId, rolloff: RolloffModel) {
        if let Some(emitter) = self.emitters.get_mut(&id) {
            emitter.state.rolloff = rolloff;
        }
    }

    /// Advance playback of every playing emitter by `dt` seconds. Elapsed
    /// time is not wrapped at the clip end.
    pub fn advance(&mut self, dt: f32) {
        for emitter in self.emitters.values_mut() {
            if emitter.state.playing && emitter.state.clip.is_some() {
                emitter.state.elapsed += dt;
            }
        }
    }

    /// Relay emitters attached to `host`'s phone, sorted by id
    pub fn shadows_on(&self, host: EndpointId) -> Vec<EmitterId> {
        let mut shadows: Vec<EmitterId> = self
            .emitters
            .values()
            .filter(|e| e.state.is_relay && e.host == Some(host))
            .map(|e| e.state.id)
            .collect();
        shadows.sort();
        shadows
    }

    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }
}

impl SpatialQuery for SimulatedWorld {
    fn emitters_within(&self, center: Position, radius: f32) -> Vec<EmitterId> {
        let mut found: Vec<EmitterId> = self
            .emitters
            .values()
            .filter(|e| e.state.position.distance(&center) <= radius)
            .map(|e| e.state.id)
            .collect();
        found.sort();
        found
    }
}

impl EmitterSource for SimulatedWorld {
    fn emitter(&self, id: EmitterId) -> Option<EmitterState> {
        self.emitters.get(&id).map(|e| e.state.clone())
    }
}

impl ShadowMixer for SimulatedWorld {
    fn spawn_shadow(&mut self, host: EndpointId, clip: &ClipId) -> Result<EmitterId> {
        let position = self
            .players
            .get(&host)
            .map(|p| p.position)
            .ok_or_else(|| DomainError::InvalidOperation(format!("{} has no body", host)))?;

        let id = self.allocate_id();
        let clip_length = self.clip_length(clip);
        self.emitters.insert(
            id,
            SimEmitter {
                state: EmitterState {
                    id,
                    position,
                    playing: false,
                    clip: Some(clip.clone()),
                    clip_length,
                    elapsed: 0.0,
                    base_volume: 1.0,
                    rolloff: RolloffModel::default(),
                    is_relay: true,
                },
                mix: MixSettings::default(),
                components: HashMap::new(),
                occlusion: None,
                host: Some(host),
            },
        );
        debug!("Spawned shadow {} on {}", id, host);
        Ok(id)
    }

    fn set_clip(&mut self, shadow: EmitterId, clip: &ClipId) {
        self.set_sound_clip(shadow, clip.clone());
    }

    fn play(&mut self, shadow: EmitterId) {
        self.set_playing(shadow, true);
    }

    fn stop(&mut self, shadow: EmitterId) {
        self.set_playing(shadow, false);
    }

    fn seek(&mut self, shadow: EmitterId, elapsed: f32) {
        self.set_elapsed(shadow, elapsed);
    }

    fn destroy(&mut self, shadow: EmitterId) {
        self.emitters.remove(&shadow);
    }
}

impl FilterRack for SimulatedWorld {
    fn mix_settings(&self, emitter: EmitterId) -> Option<MixSettings> {
        self.emitters.get(&emitter).map(|e| e.mix)
    }

    fn set_mix_settings(&mut self, emitter: EmitterId, settings: MixSettings) {
        if let Some(e) = self.emitters.get_mut(&emitter) {
            e.mix = settings;
        }
    }

    fn component(&self, emitter: EmitterId, kind: FilterKind) -> Option<FilterComponent> {
        self.emitters
            .get(&emitter)
            .and_then(|e| e.components.get(&kind).copied())
    }

    fn set_component(&mut self, emitter: EmitterId, component: FilterComponent) {
        if let Some(e) = self.emitters.get_mut(&emitter) {
            e.components.insert(component.kind(), component);
        }
    }

    fn remove_component(&mut self, emitter: EmitterId, kind: FilterKind) {
        if let Some(e) = self.emitters.get_mut(&emitter) {
            e.components.remove(&kind);
        }
    }

    fn occlusion(&self, emitter: EmitterId) -> Option<bool> {
        self.emitters.get(&emitter).and_then(|e| e.occlusion)
    }

    fn set_occlusion(&mut self, emitter: EmitterId, enabled: bool) {
        if let Some(e) = self.emitters.get_mut(&emitter) {
            if e.occlusion.is_some() {
                e.occlusion = Some(enabled);
            }
        }
    }
}

impl PlayerRoster for SimulatedWorld {
    fn position_of(&self, endpoint: EndpointId) -> Option<Position> {
        self.players.get(&endpoint).map(|p| p.position)
    }

    fn is_player_alive(&self, endpoint: EndpointId) -> bool {
        self.players.get(&endpoint).is_some_and(|p| p.alive)
    }

    fn voice_emitter(&self, endpoint: EndpointId) -> Option<EmitterId> {
        self.players.get(&endpoint).map(|p| p.voice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spatial_query_radius() {
        let mut world = SimulatedWorld::new();
        let near = world.add_sound(Position::new(1.0, 0.0, 0.0), ClipId::new("a"));
        world.add_sound(Position::new(10.0, 0.0, 0.0), ClipId::new("b"));

        assert_eq!(world.emitters_within(Position::ORIGIN, 6.0), vec![near]);
    }

    #[test]
    fn test_shadow_follows_host() {
        let mut world = SimulatedWorld::new();
        let host = EndpointId::new(1);
        world.add_player(host, Position::ORIGIN);
        let shadow = world.spawn_shadow(host, &ClipId::new("a")).unwrap();
        assert!(world.emitter(shadow).unwrap().is_relay);

        world.move_player(host, Position::new(3.0, 0.0, 0.0));
        assert_eq!(world.emitter(shadow).unwrap().position.x, 3.0);

        world.remove_player(host);
        assert!(!world.is_alive(shadow));
    }

    #[test]
    fn test_spawn_without_host_fails() {
        let mut world = SimulatedWorld::new();
        assert!(world
            .spawn_shadow(EndpointId::new(9), &ClipId::new("a"))
            .is_err());
    }
}
