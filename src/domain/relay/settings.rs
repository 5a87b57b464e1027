use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which phone a relayed source's distance is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceReference {
    /// The phone playing the shadow
    #[default]
    Listener,
    /// The partner phone that picked the source up
    Recorder,
}

/// Relay engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Discovery radius around the recording phone
    pub recording_range: f32,
    /// Shadow volume at zero distance
    pub max_volume: f32,
    pub distance_reference: DistanceReference,
    pub cleanup_interval_secs: u64,
    /// Sweep only when more entries than this are held
    pub cleanup_threshold: usize,
}

impl RelaySettings {
    /// Entries further than this are pruned
    pub fn prune_distance(&self) -> f32 {
        self.recording_range + 7.0
    }

    /// Distance at which relay volume reaches zero
    pub fn falloff_distance(&self) -> f32 {
        self.recording_range + 3.0
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            recording_range: 6.0,
            max_volume: 0.6,
            distance_reference: DistanceReference::Listener,
            cleanup_interval_secs: 15,
            cleanup_threshold: 10,
        }
    }
}
