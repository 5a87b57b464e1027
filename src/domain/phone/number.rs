//! Phone number value object

use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 4-digit phone number in `0000..=9999`.
///
/// Serialized as a zero-padded string on the wire (`"0042"`) and as a plain
/// integer with `-1` meaning "empty" on the resync path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhoneNumber(u16);

impl PhoneNumber {
    pub const MIN: u16 = 0;
    pub const MAX: u16 = 9999;
    pub const DIGITS: usize = 4;

    pub fn new(value: u16) -> Result<Self> {
        if value > Self::MAX {
            return Err(DomainError::InvalidNumber(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Build a number from any integer, clamping into the valid range.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u16)
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    /// Next number upwards, or `None` at the top of the range.
    pub fn next(&self) -> Option<Self> {
        (self.0 < Self::MAX).then(|| Self(self.0 + 1))
    }

    /// Next number downwards, or `None` at zero.
    pub fn prev(&self) -> Option<Self> {
        (self.0 > Self::MIN).then(|| Self(self.0 - 1))
    }

    /// Encode for the resync path.
    pub fn to_sentinel(number: Option<PhoneNumber>) -> i32 {
        number.map(|n| n.0 as i32).unwrap_or(-1)
    }

    /// Decode from the resync path. Out-of-range values decode as empty.
    pub fn from_sentinel(raw: i32) -> Option<PhoneNumber> {
        u16::try_from(raw).ok().and_then(|v| Self::new(v).ok())
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl FromStr for PhoneNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != Self::DIGITS || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidNumber(s.to_string()));
        }
        let value = s
            .parse::<u16>()
            .map_err(|_| DomainError::InvalidNumber(s.to_string()))?;
        Self::new(value)
    }
}

impl Serialize for PhoneNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PhoneNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(PhoneNumber::new(42).unwrap().to_string(), "0042");
        assert_eq!(PhoneNumber::new(9999).unwrap().to_string(), "9999");
        assert_eq!(PhoneNumber::new(0).unwrap().to_string(), "0000");
    }

    #[test]
    fn test_parse() {
        assert_eq!("0099".parse::<PhoneNumber>().unwrap().value(), 99);
        assert!("99".parse::<PhoneNumber>().is_err());
        assert!("12a4".parse::<PhoneNumber>().is_err());
        assert!("+123".parse::<PhoneNumber>().is_err());
        assert!("10000".parse::<PhoneNumber>().is_err());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(PhoneNumber::new(10000).is_err());
        assert_eq!(PhoneNumber::clamped(12345).value(), 9999);
        assert_eq!(PhoneNumber::clamped(-5).value(), 0);
    }

    #[test]
    fn test_wire_format() {
        let number = PhoneNumber::new(42).unwrap();
        assert_eq!(serde_json::to_string(&number).unwrap(), "\"0042\"");
        let decoded: PhoneNumber = serde_json::from_str("\"0042\"").unwrap();
        assert_eq!(decoded, number);
        assert!(serde_json::from_str::<PhoneNumber>("42").is_err());
    }

    #[test]
    fn test_sentinel() {
        assert_eq!(PhoneNumber::to_sentinel(None), -1);
        assert_eq!(PhoneNumber::to_sentinel(PhoneNumber::new(7).ok()), 7);
        assert_eq!(PhoneNumber::from_sentinel(-1), None);
        assert_eq!(PhoneNumber::from_sentinel(10000), None);
        assert_eq!(PhoneNumber::from_sentinel(42), PhoneNumber::new(42).ok());
    }

    #[test]
    fn test_next_stops_at_top() {
        assert_eq!(PhoneNumber::new(9999).unwrap().next(), None);
        assert_eq!(PhoneNumber::new(0).unwrap().prev(), None);
        assert_eq!(PhoneNumber::new(5).unwrap().next().unwrap().value(), 6);
    }
}
