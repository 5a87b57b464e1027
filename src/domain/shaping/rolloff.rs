//! Distance attenuation models

use serde::{Deserialize, Serialize};

/// How an emitter's loudness falls off with distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RolloffModel {
    /// Full volume up to `min`, silent at `max`
    Linear { min: f32, max: f32 },
    /// Piecewise-linear `(t, gain)` curve sampled at `distance / max`
    Custom { max: f32, curve: Vec<(f32, f32)> },
    /// Inverse falloff `min / distance`
    Logarithmic { min: f32 },
}

impl Default for RolloffModel {
    fn default() -> Self {
        RolloffModel::Logarithmic { min: 1.0 }
    }
}

impl RolloffModel {
    /// Attenuation factor in 0.0..=1.0 at `distance`
    pub fn attenuation(&self, distance: f32) -> f32 {
        let distance = distance.max(0.0);
        match self {
            RolloffModel::Linear { min, max } => clamp01(inverse_lerp(*max, *min, distance)),
            RolloffModel::Custom { max, curve } => {
                if *max <= 0.0 {
                    return evaluate_curve(curve, 0.0);
                }
                evaluate_curve(curve, distance / max)
            }
            RolloffModel::Logarithmic { min } => {
                if distance <= 0.0 {
                    1.0
                } else {
                    clamp01(min / distance)
                }
            }
        }
    }
}

pub(crate) fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * clamp01(t)
}

fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        return 0.0;
    }
    (value - a) / (b - a)
}

/// Curve keys must be sorted by `t`. Values outside the keyed range hold the
/// nearest key; an empty curve is silent.
fn evaluate_curve(curve: &[(f32, f32)], t: f32) -> f32 {
    let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
        return 0.0;
    };
    if t <= first.0 {
        return clamp01(first.1);
    }
    if t >= last.0 {
        return clamp01(last.1);
    }

    for pair in curve.windows(2) {
        let (t0, v0) = pair[0];
        let (t1, v1) = pair[1];
        if t >= t0 && t <= t1 {
            return clamp01(lerp(v0, v1, inverse_lerp(t0, t1, t)));
        }
    }
    clamp01(last.1)
}
