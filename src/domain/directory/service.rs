//! Directory service
//!
//! Resolves numbers to endpoints and turns endpoint → directory messages into
//! deliveries for the target endpoint.

use super::registry::Directory;
use crate::domain::phone::message::{ClientMessage, Delivery, Envelope, ServerMessage};
use crate::domain::phone::number::PhoneNumber;
use crate::domain::phone::value_object::CallValues;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::EndpointId;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub const INVALID_NUMBER_REASON: &str = "Invalid #";

/// Authoritative routing role. Held by the server only.
pub struct DirectoryService {
    directory: Directory,
    /// Last snapshot reported by each endpoint, replayed to late joiners
    last_values: HashMap<EndpointId, CallValues>,
}

impl DirectoryService {
    pub fn new(directory: Directory) -> Self {
        Self {
            directory,
            last_values: HashMap::new(),
        }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn last_values(&self, endpoint: EndpointId) -> Option<&CallValues> {
        self.last_values.get(&endpoint)
    }

    /// Route one message. Never fails: anything that cannot be routed is
    /// logged and dropped, or answered with an `InvalidCall`.
    pub fn handle(&mut self, envelope: Envelope) -> Vec<Delivery> {
        debug!(
            "Directory handling {} from {}",
            envelope.message.kind(),
            envelope.origin
        );

        match envelope.message {
            ServerMessage::AllocateNumber {
                endpoint,
                requested,
            } => match self.allocate(endpoint, requested) {
                Ok(deliveries) => deliveries,
                Err(e) => {
                    warn!("Could not allocate a number for {}: {}", endpoint, e);
                    Vec::new()
                }
            },
            ServerMessage::MakeOutgoingCall { number, sender } => {
                self.route_outgoing_call(number, sender)
            }
            ServerMessage::AcceptIncomingCall { number, accepter } => {
                let Some(accepter_number) = self.sender_number(accepter) else {
                    return Vec::new();
                };
                self.route(
                    number,
                    ClientMessage::CallAccepted {
                        accepter,
                        accepter_number,
                    },
                )
            }
            ServerMessage::HangUpCall { number, canceller } => {
                let Some(canceller_number) = self.sender_number(canceller) else {
                    return Vec::new();
                };
                self.route(
                    number,
                    ClientMessage::HangUpCall {
                        canceller,
                        canceller_number,
                    },
                )
            }
            ServerMessage::LineBusy { number } => self.route(number, ClientMessage::LineBusy),
            ServerMessage::UpdateCallValues { endpoint, values } => {
                self.last_values.insert(endpoint, values);
                vec![Delivery::new(
                    endpoint,
                    ClientMessage::UpdateCallValues { values },
                )]
            }
            ServerMessage::StopRinging { endpoint } => {
                vec![Delivery::new(endpoint, ClientMessage::StopRinging)]
            }
            ServerMessage::ReleaseEndpoint { endpoint } => self.remove_endpoint(endpoint),
        }
    }

    fn allocate(&mut self, endpoint: EndpointId, requested: Option<i32>) -> Result<Vec<Delivery>> {
        let number = self.directory.allocate(endpoint, requested)?;

        let mut deliveries = vec![Delivery::new(
            endpoint,
            ClientMessage::NumberAssigned { number },
        )];

        // Bring the newcomer's client up to date on everyone else.
        for (other_number, other) in self.directory.entries() {
            if other == endpoint {
                continue;
            }
            deliveries.push(Delivery::new(
                other,
                ClientMessage::NumberAssigned {
                    number: other_number,
                },
            ));
            if let Some(values) = self.last_values.get(&other) {
                deliveries.push(Delivery::new(
                    other,
                    ClientMessage::UpdateCallValues { values: *values },
                ));
            }
        }

        Ok(deliveries)
    }

    fn route_outgoing_call(&mut self, number: PhoneNumber, sender: EndpointId) -> Vec<Delivery> {
        let Some(sender_number) = self.sender_number(sender) else {
            return Vec::new();
        };

        match self.directory.lookup(&number) {
            Some(handle) => {
                info!("Routing call {} -> {}", sender_number, number);
                vec![Delivery::new(
                    handle.endpoint,
                    ClientMessage::ReceiveCall {
                        caller: sender,
                        caller_number: sender_number,
                    },
                )]
            }
            None => {
                let e = DomainError::RoutingFailure(number.to_string());
                info!("Call from {} failed: {}", sender_number, e);
                vec![Delivery::new(
                    sender,
                    ClientMessage::InvalidCall {
                        reason: INVALID_NUMBER_REASON.to_string(),
                    },
                )]
            }
        }
    }

    fn route(&self, number: PhoneNumber, message: ClientMessage) -> Vec<Delivery> {
        match self.directory.lookup(&number) {
            Some(handle) => vec![Delivery::new(handle.endpoint, message)],
            None => {
                debug!("Dropping {} for unregistered {}", message.kind(), number);
                Vec::new()
            }
        }
    }

    fn sender_number(&self, sender: EndpointId) -> Option<PhoneNumber> {
        let number = self.directory.number_of(sender);
        if number.is_none() {
            warn!("{}", DomainError::MissingNumber(sender.to_string()));
        }
        number
    }

    /// Tear down an endpoint: release its number and hang up on anyone it
    /// was bound to.
    pub fn remove_endpoint(&mut self, endpoint: EndpointId) -> Vec<Delivery> {
        let values = self.last_values.remove(&endpoint).unwrap_or_default();

        let Some(number) = self.directory.release_endpoint(endpoint) else {
            debug!("{} left without a number", endpoint);
            return Vec::new();
        };

        let mut deliveries = vec![Delivery::new(endpoint, ClientMessage::NumberReleased)];
        for partner_number in values.bound_numbers() {
            if let Some(handle) = self.directory.lookup(&partner_number) {
                info!(
                    "{} left while bound to {}, hanging up",
                    number, partner_number
                );
                deliveries.push(Delivery::new(
                    handle.endpoint,
                    ClientMessage::HangUpCall {
                        canceller: endpoint,
                        canceller_number: number,
                    },
                ));
            }
        }
        deliveries
    }
}
