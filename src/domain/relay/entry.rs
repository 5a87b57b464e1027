use crate::domain::shaping::filter::PhoneFilter;
use crate::domain::shared::value_objects::{ClipId, EmitterId};

/// One relayed source and the shadow emitter replaying it.
#[derive(Debug, Clone)]
pub struct RelayEntry {
    pub source: EmitterId,
    pub shadow: EmitterId,
    pub clip: ClipId,
    /// Gain written on the last tick
    pub volume: f32,
    /// Playback offset the shadow was last pinned to
    pub last_offset: f32,
    pub last_distance: f32,
    pub(crate) filter: PhoneFilter,
}

impl RelayEntry {
    pub fn new(source: EmitterId, shadow: EmitterId, clip: ClipId, filter: PhoneFilter) -> Self {
        Self {
            source,
            shadow,
            clip,
            volume: 0.0,
            last_offset: 0.0,
            last_distance: 0.0,
            filter,
        }
    }
}
