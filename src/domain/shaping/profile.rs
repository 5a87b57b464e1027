//! Phone line filter parameters

use super::rack::FilterComponent;
use super::rolloff::{clamp01, lerp, RolloffModel};
use serde::{Deserialize, Serialize};

pub const HIGH_PASS_CUTOFF: f32 = 1613.0;

/// Filter settings for one phone-line sound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterProfile {
    pub distortion: f32,
    pub low_pass_cutoff: f32,
    pub low_pass_resonance: f32,
    pub high_pass_cutoff: f32,
    pub high_pass_resonance: f32,
}

impl FilterProfile {
    /// Values written when the filter is first installed
    pub const INSTALL: FilterProfile = FilterProfile {
        distortion: 0.4,
        low_pass_cutoff: 2899.0,
        low_pass_resonance: 3.0,
        high_pass_cutoff: HIGH_PASS_CUTOFF,
        high_pass_resonance: 1.0,
    };

    /// Interpolate between the worst line (0.0) and the best (1.0).
    pub fn for_quality(quality: f32) -> Self {
        let q = clamp01(quality);
        Self {
            distortion: lerp(0.7, 0.3, q),
            low_pass_cutoff: lerp(2000.0, 2899.0, q),
            low_pass_resonance: lerp(5.0, 3.0, q),
            high_pass_cutoff: HIGH_PASS_CUTOFF,
            high_pass_resonance: lerp(2.0, 1.0, q),
        }
    }

    pub fn components(&self) -> [FilterComponent; 3] {
        [
            FilterComponent::Distortion {
                enabled: true,
                level: self.distortion,
            },
            FilterComponent::LowPass {
                enabled: true,
                cutoff: self.low_pass_cutoff,
                resonance: self.low_pass_resonance,
            },
            FilterComponent::HighPass {
                enabled: true,
                cutoff: self.high_pass_cutoff,
                resonance: self.high_pass_resonance,
            },
        ]
    }
}

impl Default for FilterProfile {
    fn default() -> Self {
        Self::for_quality(1.0)
    }
}

/// Gain of a shadow emitter: relay volume, scaled by the source's own rolloff
/// at `distance` and by the source's base volume.
pub fn shadow_gain(relay_volume: f32, rolloff: &RolloffModel, distance: f32, base_volume: f32) -> f32 {
    relay_volume * rolloff.attenuation(distance) * base_volume
}
