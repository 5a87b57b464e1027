//! Deterministic in-process network
//!
//! Runs a server and any number of clients on one task with a manual clock.
//! Messages are pumped until the network is quiet, so each call to [`tick`]
//! or [`pump`] leaves every client converged.
//!
//! [`tick`]: LocalNetwork::tick
//! [`pump`]: LocalNetwork::pump

use super::client::{PhoneClient, TickReport};
use super::server::PhoneServer;
use crate::domain::phone::message::Envelope;
use crate::domain::relay::ports::AudioWorld;
use crate::domain::shared::value_objects::EndpointId;
use std::time::{Duration, Instant};
use tracing::warn;

const MAX_ROUNDS: usize = 64;

pub struct LocalNetwork<W: AudioWorld> {
    server: PhoneServer,
    clients: Vec<PhoneClient<W>>,
    now: Instant,
}

impl<W: AudioWorld> LocalNetwork<W> {
    pub fn new(server: PhoneServer) -> Self {
        Self {
            server,
            clients: Vec::new(),
            now: Instant::now(),
        }
    }

    pub fn server(&self) -> &PhoneServer {
        &self.server
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    /// Add a client and return its index.
    pub fn join(&mut self, client: PhoneClient<W>) -> usize {
        self.clients.push(client);
        self.clients.len() - 1
    }

    pub fn client(&self, index: usize) -> &PhoneClient<W> {
        &self.clients[index]
    }

    pub fn client_mut(&mut self, index: usize) -> &mut PhoneClient<W> {
        &mut self.clients[index]
    }

    pub fn clients(&self) -> &[PhoneClient<W>] {
        &self.clients
    }

    /// Route queued messages until no client has anything left to send.
    /// Returns how many envelopes were routed.
    pub async fn pump(&mut self) -> usize {
        let mut routed = 0;
        for _ in 0..MAX_ROUNDS {
            let outgoing: Vec<Envelope> = self.clients.iter_mut().flat_map(|c| c.flush()).collect();
            if outgoing.is_empty() {
                return routed;
            }
            for envelope in outgoing {
                self.route(envelope).await;
                routed += 1;
            }
        }
        warn!("Network still busy after {} rounds", MAX_ROUNDS);
        routed
    }

    async fn route(&mut self, envelope: Envelope) {
        let deliveries = self.server.route(envelope).await;
        for delivery in &deliveries {
            for client in self.clients.iter_mut() {
                client.apply(delivery, self.now);
            }
        }
    }

    /// Advance the clock, tick every client, then pump.
    pub async fn tick(&mut self, dt: Duration) -> Vec<TickReport> {
        self.now += dt;
        let now = self.now;
        let reports = self.clients.iter_mut().map(|c| c.tick(now)).collect();
        self.pump().await;
        reports
    }

    /// Remove a client; the server releases its number and notifies the rest.
    pub async fn leave(&mut self, index: usize) -> PhoneClient<W> {
        let mut client = self.clients.remove(index);
        let farewell = client.leave();
        self.route(farewell).await;
        self.pump().await;
        client
    }

    /// Index of the client owning `endpoint`
    pub fn index_of(&self, endpoint: EndpointId) -> Option<usize> {
        self.clients.iter().position(|c| c.local_id() == endpoint)
    }
}
