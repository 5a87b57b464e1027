//! Event plumbing shared by the phone aggregate and its consumers

use super::value_objects::EndpointId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Something that happened to one phone.
pub trait DomainEvent: Send + Sync {
    /// Dotted name, e.g. `phone.connected`
    fn event_type(&self) -> &'static str;

    fn occurred_at(&self) -> DateTime<Utc>;

    /// Phone the event belongs to
    fn endpoint(&self) -> EndpointId;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub event_type: String,
}

impl EventMetadata {
    pub fn new(event_type: &str) -> Self {
        Self::at(event_type, Utc::now())
    }

    pub fn at(event_type: &str, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at,
            event_type: event_type.to_string(),
        }
    }
}
