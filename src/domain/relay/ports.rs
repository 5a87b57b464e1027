//! Ports onto the audio engine consumed by the relay
//!
//! The relay never owns emitters. It asks the engine what exists and tells it
//! what to create and destroy; everything is addressed by stable ids and a
//! lookup returning `None` means the emitter is gone.

use crate::domain::shaping::rack::FilterRack;
use crate::domain::shaping::rolloff::RolloffModel;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{ClipId, EmitterId, EndpointId, Position};

/// Playback state of one emitter, read once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterState {
    pub id: EmitterId,
    pub position: Position,
    pub playing: bool,
    pub clip: Option<ClipId>,
    /// Length of `clip` in seconds
    pub clip_length: f32,
    /// Playback position in seconds
    pub elapsed: f32,
    pub base_volume: f32,
    pub rolloff: RolloffModel,
    /// Emitters created by the relay itself
    pub is_relay: bool,
}

/// Bounded-radius proximity search.
pub trait SpatialQuery {
    fn emitters_within(&self, center: Position, radius: f32) -> Vec<EmitterId>;
}

pub trait EmitterSource {
    fn emitter(&self, id: EmitterId) -> Option<EmitterState>;

    fn is_alive(&self, id: EmitterId) -> bool {
        self.emitter(id).is_some()
    }
}

/// Creates and drives the relay's own emitters.
pub trait ShadowMixer {
    /// Spawn a stopped emitter on `host`'s phone, tagged as a relay emitter.
    fn spawn_shadow(&mut self, host: EndpointId, clip: &ClipId) -> Result<EmitterId>;

    fn set_clip(&mut self, shadow: EmitterId, clip: &ClipId);

    fn play(&mut self, shadow: EmitterId);

    fn stop(&mut self, shadow: EmitterId);

    fn seek(&mut self, shadow: EmitterId, elapsed: f32);

    fn destroy(&mut self, shadow: EmitterId);
}

/// Player bodies carrying the phones.
pub trait PlayerRoster {
    fn position_of(&self, endpoint: EndpointId) -> Option<Position>;

    fn is_player_alive(&self, endpoint: EndpointId) -> bool;

    /// The emitter carrying `endpoint`'s live voice
    fn voice_emitter(&self, endpoint: EndpointId) -> Option<EmitterId>;
}

/// Everything a client's audio side needs from the engine.
pub trait AudioWorld: SpatialQuery + EmitterSource + ShadowMixer + FilterRack + PlayerRoster {}

impl<T> AudioWorld for T where T: SpatialQuery + EmitterSource + ShadowMixer + FilterRack + PlayerRoster {}
