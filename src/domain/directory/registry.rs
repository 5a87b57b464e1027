//! Phone number registry - authoritative number → endpoint bindings

use crate::domain::phone::number::PhoneNumber;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::EndpointId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::{debug, info};

/// Where routed messages for a number go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointHandle {
    pub endpoint: EndpointId,
}

/// In-memory directory.
///
/// Keeps the number → endpoint id map and the number → handle map side by
/// side; both are always updated together.
pub struct Directory {
    /// Map of number to owning endpoint
    numbers: HashMap<PhoneNumber, EndpointId>,
    /// Map of number to routing handle
    handles: HashMap<PhoneNumber, EndpointHandle>,
    rng: StdRng,
}

impl Directory {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a directory with a fixed random source (tests, replays)
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            numbers: HashMap::new(),
            handles: HashMap::new(),
            rng,
        }
    }

    /// Assign a number to `endpoint`.
    ///
    /// The starting point is `requested` clamped to 0..=9999, or a uniform
    /// random pick. Taken numbers are skipped by probing upwards one at a time
    /// up to 9999; if nothing is free above, probing continues downwards from
    /// the starting point. An endpoint that already holds a number keeps it.
    pub fn allocate(&mut self, endpoint: EndpointId, requested: Option<i32>) -> Result<PhoneNumber> {
        if let Some(existing) = self.number_of(endpoint) {
            debug!("{} already holds {}", endpoint, existing);
            return Ok(existing);
        }

        let start = match requested {
            Some(value) => PhoneNumber::clamped(value as i64),
            None => PhoneNumber::clamped(
                self.rng
                    .gen_range(PhoneNumber::MIN as i64..=PhoneNumber::MAX as i64),
            ),
        };

        let number = self.next_free(start).ok_or(DomainError::DirectoryFull)?;

        self.numbers.insert(number, endpoint);
        self.handles.insert(number, EndpointHandle { endpoint });
        info!("Registered: {} -> {}", number, endpoint);

        Ok(number)
    }

    fn next_free(&self, start: PhoneNumber) -> Option<PhoneNumber> {
        let mut candidate = Some(start);
        while let Some(number) = candidate {
            if !self.numbers.contains_key(&number) {
                return Some(number);
            }
            candidate = number.next();
        }

        let mut candidate = start.prev();
        while let Some(number) = candidate {
            if !self.numbers.contains_key(&number) {
                return Some(number);
            }
            candidate = number.prev();
        }
        None
    }

    /// Resolve a number to its routing handle.
    pub fn lookup(&self, number: &PhoneNumber) -> Option<EndpointHandle> {
        self.handles.get(number).copied()
    }

    /// Endpoint registered under `number`.
    pub fn endpoint_of(&self, number: &PhoneNumber) -> Option<EndpointId> {
        self.numbers.get(number).copied()
    }

    /// Reverse scan: the number held by `endpoint`.
    pub fn number_of(&self, endpoint: EndpointId) -> Option<PhoneNumber> {
        self.numbers
            .iter()
            .find(|(_, owner)| **owner == endpoint)
            .map(|(number, _)| *number)
    }

    /// Remove a number. Returns the endpoint that held it, if any.
    pub fn release(&mut self, number: &PhoneNumber) -> Option<EndpointId> {
        self.handles.remove(number);
        let owner = self.numbers.remove(number);
        if let Some(owner) = owner {
            info!("Unregistered: {} (was {})", number, owner);
        }
        owner
    }

    /// Release whatever number `endpoint` holds. No-op without one.
    pub fn release_endpoint(&mut self, endpoint: EndpointId) -> Option<PhoneNumber> {
        let number = self.number_of(endpoint)?;
        self.release(&number);
        Some(number)
    }

    /// All registrations, sorted by number
    pub fn entries(&self) -> Vec<(PhoneNumber, EndpointId)> {
        let mut entries: Vec<_> = self.numbers.iter().map(|(n, e)| (*n, *e)).collect();
        entries.sort();
        entries
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ep(id: u64) -> EndpointId {
        EndpointId::new(id)
    }

    #[test]
    fn test_requested_number_is_used() {
        let mut directory = Directory::with_seed(1);
        let number = directory.allocate(ep(1), Some(42)).unwrap();
        assert_eq!(number.to_string(), "0042");
        assert_eq!(directory.endpoint_of(&number), Some(ep(1)));
        assert_eq!(directory.lookup(&number).unwrap().endpoint, ep(1));
    }

    #[test]
    fn test_collision_steps_upwards() {
        let mut directory = Directory::with_seed(1);
        directory.allocate(ep(1), Some(1234)).unwrap();
        directory.allocate(ep(2), Some(1235)).unwrap();

        let number = directory.allocate(ep(3), Some(1234)).unwrap();
        assert_eq!(number.value(), 1236);
    }

    #[test]
    fn test_requested_number_is_clamped() {
        let mut directory = Directory::with_seed(1);
        assert_eq!(directory.allocate(ep(1), Some(20000)).unwrap().value(), 9999);
        assert_eq!(directory.allocate(ep(2), Some(-3)).unwrap().value(), 0);
    }

    #[test]
    fn test_collision_does_not_wrap_past_top() {
        let mut directory = Directory::with_seed(1);
        directory.allocate(ep(1), Some(9998)).unwrap();
        directory.allocate(ep(2), Some(9999)).unwrap();

        let number = directory.allocate(ep(3), Some(9998)).unwrap();
        assert_eq!(number.value(), 9997);
    }

    #[test]
    fn test_full_directory() {
        let mut directory = Directory::with_seed(1);
        for i in 0..10000u64 {
            directory.allocate(ep(i), Some(i as i32)).unwrap();
        }
        assert_eq!(
            directory.allocate(ep(10000), None),
            Err(DomainError::DirectoryFull)
        );
    }

    #[test]
    fn test_uniqueness_under_random_allocation() {
        let mut directory = Directory::with_seed(7);
        let mut seen = HashSet::new();
        for i in 0..500u64 {
            let requested = if i % 3 == 0 { Some(5000) } else { None };
            let number = directory.allocate(ep(i), requested).unwrap();
            assert!(seen.insert(number), "{} handed out twice", number);
        }
        assert_eq!(directory.len(), 500);
    }

    #[test]
    fn test_endpoint_keeps_existing_number() {
        let mut directory = Directory::with_seed(1);
        let first = directory.allocate(ep(1), Some(10)).unwrap();
        let second = directory.allocate(ep(1), Some(20)).unwrap();
        assert_eq!(first, second);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut directory = Directory::with_seed(1);
        let number = directory.allocate(ep(1), Some(10)).unwrap();

        assert_eq!(directory.release(&number), Some(ep(1)));
        assert_eq!(directory.release(&number), None);
        assert!(directory.lookup(&number).is_none());
        assert!(directory.is_empty());
    }

    #[test]
    fn test_release_endpoint_by_reverse_scan() {
        let mut directory = Directory::with_seed(1);
        directory.allocate(ep(1), Some(10)).unwrap();
        let number = directory.allocate(ep(2), Some(11)).unwrap();

        assert_eq!(directory.release_endpoint(ep(2)), Some(number));
        assert_eq!(directory.release_endpoint(ep(2)), None);
        assert_eq!(directory.release_endpoint(ep(3)), None);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_released_number_can_be_reused() {
        let mut directory = Directory::with_seed(1);
        directory.allocate(ep(1), Some(10)).unwrap();
        directory.release_endpoint(ep(1));
        assert_eq!(directory.allocate(ep(2), Some(10)).unwrap().value(), 10);
    }
}
