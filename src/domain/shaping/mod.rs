//! Signal shaping - distance attenuation and the phone line filter

pub mod filter;
pub mod profile;
pub mod rack;
pub mod rolloff;
pub mod voice;

pub use filter::PhoneFilter;
pub use profile::{shadow_gain, FilterProfile};
pub use rack::{FilterComponent, FilterKind, FilterRack, MixSettings};
pub use rolloff::RolloffModel;
pub use voice::PhoneVoice;
