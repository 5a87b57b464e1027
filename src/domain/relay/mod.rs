//! Audio relay - replays sounds near one phone on the other end of the call

pub mod engine;
pub mod entry;
pub mod ports;
pub mod settings;

pub use engine::{seed_offset, MirrorReport, RelayEngine};
pub use entry::RelayEntry;
pub use ports::{AudioWorld, EmitterSource, EmitterState, PlayerRoster, ShadowMixer, SpatialQuery};
pub use settings::{DistanceReference, RelaySettings};
