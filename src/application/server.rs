//! Phone server
//!
//! The authoritative side. Owns the directory, routes every endpoint message
//! through it and broadcasts the resulting deliveries to all attached clients.

use crate::domain::directory::DirectoryService;
use crate::domain::phone::message::{ClientMessage, Delivery, Envelope, ServerMessage};
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::EndpointId;
use crate::infrastructure::metrics;
use crate::infrastructure::transport::DeliverySink;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

pub struct PhoneServer {
    directory: Arc<RwLock<DirectoryService>>,
    clients: Arc<RwLock<HashMap<EndpointId, Arc<dyn DeliverySink>>>>,
}

impl PhoneServer {
    pub fn new(directory: DirectoryService) -> Self {
        Self {
            directory: Arc::new(RwLock::new(directory)),
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Attach a client connection. It receives every delivery from now on.
    pub async fn attach(&self, endpoint: EndpointId, sink: Arc<dyn DeliverySink>) {
        self.clients.write().await.insert(endpoint, sink);
        info!("Client attached: {}", endpoint);
    }

    /// Detach a client connection and tear its endpoint down.
    pub async fn detach(&self, endpoint: EndpointId) -> Result<usize> {
        self.clients.write().await.remove(&endpoint);
        info!("Client detached: {}", endpoint);
        self.dispatch(Envelope::new(
            endpoint,
            ServerMessage::ReleaseEndpoint { endpoint },
        ))
        .await
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn registered_numbers(&self) -> usize {
        self.directory.read().await.directory().len()
    }

    /// Run one message through the directory without delivering anything.
    pub async fn route(&self, envelope: Envelope) -> Vec<Delivery> {
        let kind = envelope.message.kind();
        let is_call = matches!(envelope.message, ServerMessage::MakeOutgoingCall { .. });
        let is_busy = matches!(envelope.message, ServerMessage::LineBusy { .. });

        let (deliveries, registered) = {
            let mut directory = self.directory.write().await;
            let deliveries = directory.handle(envelope);
            (deliveries, directory.directory().len())
        };

        metrics::record_message_routed(kind);
        if is_busy {
            metrics::record_call("busy");
        }
        for delivery in &deliveries {
            match &delivery.message {
                ClientMessage::ReceiveCall { .. } if is_call => metrics::record_call("routed"),
                ClientMessage::InvalidCall { .. } => metrics::record_call("invalid"),
                ClientMessage::NumberAssigned { .. } if kind == "allocate_number" => {
                    metrics::record_number_allocated();
                    break;
                }
                _ => {}
            }
        }
        metrics::update_registered_numbers(registered);

        deliveries
    }

    /// Route a message and broadcast the deliveries. Returns how many
    /// deliveries were produced.
    ///
    /// A client whose sink has closed is detached on the spot and gets
    /// nothing further.
    pub async fn dispatch(&self, envelope: Envelope) -> Result<usize> {
        let deliveries = self.route(envelope).await;
        let count = deliveries.len();

        let mut closed: Vec<EndpointId> = Vec::new();
        {
            let clients = self.clients.read().await;
            for delivery in deliveries {
                debug!("<- {} for {}", delivery.message.kind(), delivery.target);
                for (endpoint, sink) in clients.iter() {
                    if closed.contains(endpoint) {
                        continue;
                    }
                    if let Err(e) = sink.deliver(delivery.clone()).await {
                        debug!("Client {} unreachable: {}", endpoint, e);
                        closed.push(*endpoint);
                    }
                }
            }
        }

        if !closed.is_empty() {
            let mut clients = self.clients.write().await;
            for endpoint in closed {
                clients.remove(&endpoint);
                info!("Client {} went away, detached", endpoint);
            }
        }
        Ok(count)
    }

    /// Serve `inbox` until every sender is gone.
    pub async fn run(&self, mut inbox: mpsc::UnboundedReceiver<Envelope>) {
        info!("Phone server running");
        while let Some(envelope) = inbox.recv().await {
            if let Err(e) = self.dispatch(envelope).await {
                warn!("Dispatch failed: {}", e);
            }
        }
        info!("Phone server inbox closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::Directory;
    use crate::infrastructure::transport::MockDeliverySink;

    fn allocate(endpoint: u64, requested: i32) -> Envelope {
        Envelope::new(
            EndpointId::new(endpoint),
            ServerMessage::AllocateNumber {
                endpoint: EndpointId::new(endpoint),
                requested: Some(requested),
            },
        )
    }

    #[tokio::test]
    async fn test_dispatch_broadcasts_to_every_client() {
        let server = PhoneServer::new(DirectoryService::new(Directory::with_seed(1)));

        for id in [1, 2] {
            let mut sink = MockDeliverySink::new();
            sink.expect_deliver()
                .withf(|d| d.target == EndpointId::new(1))
                .times(1)
                .returning(|_| Ok(()));
            server.attach(EndpointId::new(id), Arc::new(sink)).await;
        }

        let count = server.dispatch(allocate(1, 99)).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(server.registered_numbers().await, 1);
    }

    #[tokio::test]
    async fn test_failed_sink_does_not_stop_broadcast() {
        let server = PhoneServer::new(DirectoryService::new(Directory::with_seed(1)));

        let mut broken = MockDeliverySink::new();
        broken.expect_deliver().returning(|_| {
            Err(crate::domain::shared::error::DomainError::Transport(
                "gone".to_string(),
            ))
        });
        let mut healthy = MockDeliverySink::new();
        healthy.expect_deliver().times(1).returning(|_| Ok(()));

        server.attach(EndpointId::new(1), Arc::new(broken)).await;
        server.attach(EndpointId::new(2), Arc::new(healthy)).await;

        assert_eq!(server.dispatch(allocate(2, 42)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_closed_sink_detached_after_first_failure() {
        let server = PhoneServer::new(DirectoryService::new(Directory::with_seed(1)));

        let mut broken = MockDeliverySink::new();
        broken.expect_deliver().times(1).returning(|_| {
            Err(crate::domain::shared::error::DomainError::Transport(
                "gone".to_string(),
            ))
        });
        let mut healthy = MockDeliverySink::new();
        healthy.expect_deliver().times(3).returning(|_| Ok(()));

        server.attach(EndpointId::new(1), Arc::new(broken)).await;
        server.attach(EndpointId::new(2), Arc::new(healthy)).await;

        server.dispatch(allocate(2, 42)).await.unwrap();
        assert_eq!(server.client_count().await, 1);

        // A second allocation also resyncs the first number: two deliveries,
        // none of them offered to the closed sink.
        assert_eq!(server.dispatch(allocate(3, 7)).await.unwrap(), 2);
        assert_eq!(server.client_count().await, 1);
    }

    #[tokio::test]
    async fn test_detach_releases_number() {
        let server = PhoneServer::new(DirectoryService::new(Directory::with_seed(1)));
        server.route(allocate(1, 99)).await;
        assert_eq!(server.registered_numbers().await, 1);

        server.detach(EndpointId::new(1)).await.unwrap();
        assert_eq!(server.registered_numbers().await, 0);
    }
}
