//! Client event loop

use super::client::{PhoneClient, PhoneCommand};
use crate::domain::phone::message::Delivery;
use crate::domain::relay::ports::AudioWorld;
use crate::domain::shared::events::DomainEvent;
use crate::infrastructure::transport::Transport;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Drive a client until its command channel closes.
///
/// Deliveries, commands and ticks are handled one at a time on this task, so
/// the client's call state and relay tables need no locking. After each step
/// the client's outgoing messages are flushed to `transport`. On exit the
/// client leaves the network and is handed back.
pub async fn run_client<W, T>(
    mut client: PhoneClient<W>,
    transport: T,
    mut inbox: mpsc::UnboundedReceiver<Delivery>,
    mut commands: mpsc::UnboundedReceiver<PhoneCommand>,
    tick_interval: Duration,
) -> PhoneClient<W>
where
    W: AudioWorld + Send,
    T: Transport,
{
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!("Client {} running", client.local_id());

    loop {
        tokio::select! {
            Some(delivery) = inbox.recv() => {
                client.apply(&delivery, Instant::now());
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                if let Err(e) = client.execute(command, Instant::now()) {
                    debug!("{} ignored {:?}: {}", client.local_id(), command, e);
                }
            }
            _ = ticker.tick() => {
                client.tick(Instant::now());
            }
        }

        let state = client.local().map_or("gone", |phone| phone.state().as_str());
        for event in client.take_events() {
            match serde_json::to_string(&event.kind) {
                Ok(json) => info!(
                    event = event.event_type(),
                    id = %event.metadata.event_id,
                    cue = ?event.kind.cue(),
                    state,
                    "{} {}",
                    event.endpoint,
                    json
                ),
                Err(e) => warn!("Unserializable event: {}", e),
            }
        }

        for envelope in client.flush() {
            if let Err(e) = transport.send(envelope).await {
                warn!("{} lost the server: {}", client.local_id(), e);
                return client;
            }
        }
    }

    let farewell = client.leave();
    if let Err(e) = transport.send(farewell).await {
        debug!("Could not say goodbye: {}", e);
    }
    info!("Client {} stopped", client.local_id());
    client
}
