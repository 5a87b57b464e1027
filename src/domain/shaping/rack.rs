//! Filter components attached to an emitter, and the port that edits them

use crate::domain::shared::value_objects::EmitterId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Distortion,
    LowPass,
    HighPass,
}

impl FilterKind {
    pub const ALL: [FilterKind; 3] = [FilterKind::Distortion, FilterKind::LowPass, FilterKind::HighPass];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterComponent {
    Distortion {
        enabled: bool,
        level: f32,
    },
    LowPass {
        enabled: bool,
        cutoff: f32,
        resonance: f32,
    },
    HighPass {
        enabled: bool,
        cutoff: f32,
        resonance: f32,
    },
}

impl FilterComponent {
    pub fn kind(&self) -> FilterKind {
        match self {
            FilterComponent::Distortion { .. } => FilterKind::Distortion,
            FilterComponent::LowPass { .. } => FilterKind::LowPass,
            FilterComponent::HighPass { .. } => FilterKind::HighPass,
        }
    }

    /// Component as a freshly attached one would be
    pub fn fresh(kind: FilterKind) -> Self {
        match kind {
            FilterKind::Distortion => FilterComponent::Distortion {
                enabled: true,
                level: 0.5,
            },
            FilterKind::LowPass => FilterComponent::LowPass {
                enabled: true,
                cutoff: 5000.0,
                resonance: 1.0,
            },
            FilterKind::HighPass => FilterComponent::HighPass {
                enabled: true,
                cutoff: 5000.0,
                resonance: 1.0,
            },
        }
    }
}

/// Playback settings of an emitter that the phone filter overrides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixSettings {
    pub volume: f32,
    /// -1.0 (left) to 1.0 (right)
    pub pan: f32,
    /// 0.0 is flat 2D, 1.0 is fully positional
    pub spatial_blend: f32,
    /// Voice channels carry a separate 2D flag
    pub two_d: bool,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pan: 0.0,
            spatial_blend: 1.0,
            two_d: false,
        }
    }
}

/// Edits filter components and mix settings on emitters.
///
/// Lookups on an emitter that no longer exists return `None` and writes are
/// ignored.
pub trait FilterRack {
    fn mix_settings(&self, emitter: EmitterId) -> Option<MixSettings>;

    fn set_mix_settings(&mut self, emitter: EmitterId, settings: MixSettings);

    fn component(&self, emitter: EmitterId, kind: FilterKind) -> Option<FilterComponent>;

    /// Overwrite a component, attaching it first if missing
    fn set_component(&mut self, emitter: EmitterId, component: FilterComponent);

    fn remove_component(&mut self, emitter: EmitterId, kind: FilterKind);

    /// `None` when the emitter has no occlusion component, otherwise whether it
    /// is enabled
    fn occlusion(&self, emitter: EmitterId) -> Option<bool>;

    fn set_occlusion(&mut self, emitter: EmitterId, enabled: bool);
}
