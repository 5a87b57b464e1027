//! Rolling dial buffer

use crate::domain::phone::number::PhoneNumber;
use std::collections::VecDeque;

/// Last four digits entered on the dial. A fifth digit pushes the oldest out.
#[derive(Debug, Clone, Default)]
pub struct DialBuffer {
    digits: VecDeque<u8>,
}

impl DialBuffer {
    pub fn new() -> Self {
        Self {
            digits: VecDeque::with_capacity(PhoneNumber::DIGITS),
        }
    }

    /// Push a digit (0-9). Returns false for anything else.
    pub fn push(&mut self, digit: u8) -> bool {
        if digit > 9 {
            return false;
        }
        self.digits.push_back(digit);
        if self.digits.len() > PhoneNumber::DIGITS {
            self.digits.pop_front();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.digits.len() == PhoneNumber::DIGITS
    }

    /// Digits dialed so far, as typed.
    pub fn as_string(&self) -> String {
        self.digits.iter().map(|d| char::from(b'0' + d)).collect()
    }

    /// The dialed number once exactly four digits are present.
    pub fn number(&self) -> Option<PhoneNumber> {
        if !self.is_complete() {
            return None;
        }
        self.as_string().parse().ok()
    }

    pub fn clear(&mut self) {
        self.digits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolls_past_four_digits() {
        let mut buffer = DialBuffer::new();
        for d in [1, 2, 3, 4, 5] {
            assert!(buffer.push(d));
        }
        assert_eq!(buffer.as_string(), "2345");
        assert_eq!(buffer.number().unwrap().value(), 2345);
    }

    #[test]
    fn test_incomplete_has_no_number() {
        let mut buffer = DialBuffer::new();
        buffer.push(0);
        buffer.push(4);
        assert_eq!(buffer.as_string(), "04");
        assert!(buffer.number().is_none());
    }

    #[test]
    fn test_rejects_non_digit() {
        let mut buffer = DialBuffer::new();
        assert!(!buffer.push(10));
        assert!(buffer.is_empty());
    }
}
