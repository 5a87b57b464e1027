//! Message transport between clients and the server
//!
//! Delivery is fire-and-forget: a send succeeds once the message is queued.
//! A send only fails when the other side has gone away.

use crate::domain::phone::message::{Delivery, Envelope};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

/// Client → server link
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, envelope: Envelope) -> Result<()>;
}

/// Server → client link. Every client receives every delivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, delivery: Delivery) -> Result<()>;
}

/// In-process transport over an unbounded tokio channel
#[derive(Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl ChannelTransport {
    /// Create the transport and the server-side receiver
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, envelope: Envelope) -> Result<()> {
        debug!("-> {} from {}", envelope.message.kind(), envelope.origin);
        self.tx
            .send(envelope)
            .map_err(|e| DomainError::Transport(format!("server gone: {}", e)))
    }
}

/// Server-side handle onto one client's inbox
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl ChannelSink {
    /// Create the sink and the client-side receiver
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl DeliverySink for ChannelSink {
    async fn deliver(&self, delivery: Delivery) -> Result<()> {
        self.tx
            .send(delivery)
            .map_err(|e| DomainError::Transport(format!("client gone: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::phone::message::{ClientMessage, ServerMessage};
    use crate::domain::shared::value_objects::EndpointId;

    #[tokio::test]
    async fn test_channel_transport_delivers() {
        let (transport, mut rx) = ChannelTransport::new();
        let envelope = Envelope::new(
            EndpointId::new(1),
            ServerMessage::StopRinging {
                endpoint: EndpointId::new(1),
            },
        );
        transport.send(envelope.clone()).await.unwrap();
        assert_eq!(rx.recv().await, Some(envelope));
    }

    #[test]
    fn test_send_fails_when_receiver_dropped() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        let result = tokio_test::block_on(
            sink.deliver(Delivery::new(EndpointId::new(1), ClientMessage::LineBusy)),
        );
        assert!(matches!(result, Err(DomainError::Transport(_))));
    }

    #[test]
    fn test_sink_forwards_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        let first = Delivery::new(EndpointId::new(1), ClientMessage::NumberReleased);
        let second = Delivery::new(EndpointId::new(2), ClientMessage::LineBusy);

        tokio_test::assert_ok!(tokio_test::block_on(sink.deliver(first.clone())));
        tokio_test::assert_ok!(tokio_test::block_on(sink.deliver(second.clone())));
        assert_eq!(rx.try_recv().ok(), Some(first));
        assert_eq!(rx.try_recv().ok(), Some(second));
    }
}
