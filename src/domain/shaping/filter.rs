//! Phone filter with snapshot/restore of the emitter it was attached to
//!
//! The snapshot is taken the first time the filter touches an emitter. On
//! restore, components that existed before are put back to their captured
//! values; components the filter attached itself are removed.

use super::profile::FilterProfile;
use super::rack::{FilterComponent, FilterKind, FilterRack, MixSettings};
use crate::domain::shared::value_objects::EmitterId;
use tracing::debug;

pub const INSTALL_PAN: f32 = -0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct PhoneFilter {
    emitter: EmitterId,
    mix: MixSettings,
    components: Vec<(FilterKind, Option<FilterComponent>)>,
    occlusion: Option<bool>,
}

impl PhoneFilter {
    /// Snapshot `emitter`. `None` if the emitter does not exist.
    pub fn capture<R: FilterRack + ?Sized>(rack: &R, emitter: EmitterId) -> Option<Self> {
        let mix = rack.mix_settings(emitter)?;
        let components = FilterKind::ALL
            .iter()
            .map(|kind| (*kind, rack.component(emitter, *kind)))
            .collect();

        Some(Self {
            emitter,
            mix,
            components,
            occlusion: rack.occlusion(emitter),
        })
    }

    pub fn emitter(&self) -> EmitterId {
        self.emitter
    }

    /// Mix settings at capture time
    pub fn captured_mix(&self) -> MixSettings {
        self.mix
    }

    pub fn had_component(&self, kind: FilterKind) -> bool {
        self.components
            .iter()
            .any(|(k, component)| *k == kind && component.is_some())
    }

    /// Attach the phone filter: flat playback, occlusion off, missing
    /// components added and every component set to the install values.
    pub fn install<R: FilterRack + ?Sized>(&self, rack: &mut R) {
        rack.set_mix_settings(
            self.emitter,
            MixSettings {
                spatial_blend: 0.0,
                pan: INSTALL_PAN,
                ..self.mix
            },
        );

        for component in FilterProfile::INSTALL.components() {
            rack.set_component(self.emitter, component);
        }

        if self.occlusion.is_some() {
            rack.set_occlusion(self.emitter, false);
        }
        debug!("Phone filter installed on {}", self.emitter);
    }

    /// Scale the captured volume by `gain` and write `profile`.
    pub fn apply<R: FilterRack + ?Sized>(&self, rack: &mut R, gain: f32, profile: &FilterProfile) {
        let Some(current) = rack.mix_settings(self.emitter) else {
            return;
        };
        rack.set_mix_settings(
            self.emitter,
            MixSettings {
                volume: self.mix.volume * gain,
                ..current
            },
        );
        for component in profile.components() {
            rack.set_component(self.emitter, component);
        }
    }

    /// Put the emitter back the way it was captured.
    pub fn restore<R: FilterRack + ?Sized>(&self, rack: &mut R) {
        rack.set_mix_settings(self.emitter, self.mix);

        for (kind, original) in &self.components {
            match original {
                Some(component) => rack.set_component(self.emitter, *component),
                None => rack.remove_component(self.emitter, *kind),
            }
        }

        if let Some(enabled) = self.occlusion {
            rack.set_occlusion(self.emitter, enabled);
        }
        debug!("Phone filter removed from {}", self.emitter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Rack {
        mix: HashMap<EmitterId, MixSettings>,
        components: HashMap<(EmitterId, FilterKind), FilterComponent>,
        occlusion: HashMap<EmitterId, bool>,
    }

    impl FilterRack for Rack {
        fn mix_settings(&self, emitter: EmitterId) -> Option<MixSettings> {
            self.mix.get(&emitter).copied()
        }
        fn set_mix_settings(&mut self, emitter: EmitterId, settings: MixSettings) {
            if let Some(mix) = self.mix.get_mut(&emitter) {
                *mix = settings;
            }
        }
        fn component(&self, emitter: EmitterId, kind: FilterKind) -> Option<FilterComponent> {
            self.components.get(&(emitter, kind)).copied()
        }
        fn set_component(&mut self, emitter: EmitterId, component: FilterComponent) {
            self.components.insert((emitter, component.kind()), component);
        }
        fn remove_component(&mut self, emitter: EmitterId, kind: FilterKind) {
            self.components.remove(&(emitter, kind));
        }
        fn occlusion(&self, emitter: EmitterId) -> Option<bool> {
            self.occlusion.get(&emitter).copied()
        }
        fn set_occlusion(&mut self, emitter: EmitterId, enabled: bool) {
            if let Some(o) = self.occlusion.get_mut(&emitter) {
                *o = enabled;
            }
        }
    }

    fn emitter() -> EmitterId {
        EmitterId::new(7)
    }

    #[test]
    fn test_capture_missing_emitter() {
        let rack = Rack::default();
        assert!(PhoneFilter::capture(&rack, emitter()).is_none());
    }

    #[test]
    fn test_install_adds_components_and_flattens() {
        let mut rack = Rack::default();
        rack.mix.insert(emitter(), MixSettings::default());
        rack.occlusion.insert(emitter(), true);

        let filter = PhoneFilter::capture(&rack, emitter()).unwrap();
        filter.install(&mut rack);

        let mix = rack.mix_settings(emitter()).unwrap();
        assert_eq!(mix.spatial_blend, 0.0);
        assert_eq!(mix.pan, INSTALL_PAN);
        assert_eq!(rack.occlusion(emitter()), Some(false));
        assert_eq!(
            rack.component(emitter(), FilterKind::LowPass),
            Some(FilterComponent::LowPass {
                enabled: true,
                cutoff: 2899.0,
                resonance: 3.0
            })
        );
        assert_eq!(
            rack.component(emitter(), FilterKind::Distortion),
            Some(FilterComponent::Distortion {
                enabled: true,
                level: 0.4
            })
        );
    }

    #[test]
    fn test_restore_removes_added_components() {
        let mut rack = Rack::default();
        rack.mix.insert(
            emitter(),
            MixSettings {
                volume: 0.8,
                pan: 0.2,
                ..MixSettings::default()
            },
        );
        let original_low_pass = FilterComponent::LowPass {
            enabled: false,
            cutoff: 5000.0,
            resonance: 1.5,
        };
        rack.set_component(emitter(), original_low_pass);

        let filter = PhoneFilter::capture(&rack, emitter()).unwrap();
        assert!(filter.had_component(FilterKind::LowPass));
        assert!(!filter.had_component(FilterKind::Distortion));

        filter.install(&mut rack);
        filter.apply(&mut rack, 0.5, &FilterProfile::for_quality(0.0));
        assert!((rack.mix_settings(emitter()).unwrap().volume - 0.4).abs() < 1e-6);

        filter.restore(&mut rack);
        assert_eq!(rack.component(emitter(), FilterKind::LowPass), Some(original_low_pass));
        assert_eq!(rack.component(emitter(), FilterKind::Distortion), None);
        assert_eq!(rack.component(emitter(), FilterKind::HighPass), None);
        assert_eq!(rack.mix_settings(emitter()), Some(filter.captured_mix()));
        assert_eq!(rack.occlusion(emitter()), None);
    }
}
