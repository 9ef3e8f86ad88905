//! Mesh transport boundary.
//!
//! The radio stack itself lives outside this crate. A transport delivers
//! decoded [`InboundEvent`]s through a bounded channel (the subscription) and
//! accepts outbound text through [`MeshTransport::send_text`].

use async_trait::async_trait;
use tokio::sync::mpsc;

pub mod bridge;
pub mod console;
pub mod event;

pub use event::{InboundEvent, PortNum};

/// Buffer size of the inbound event subscription.
///
/// Events arriving while an action runs wait here; the reader applies
/// backpressure once it is full.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Receiving half of a transport subscription.
pub type EventStream = mpsc::Receiver<InboundEvent>;

/// Errors produced by transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Address that was dialled.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Writing an outbound message failed.
    #[error("send failed: {0}")]
    Send(String),
    /// The transport was closed before the operation.
    #[error("transport is closed")]
    Closed,
    /// An inbound packet could not be decoded.
    #[error("malformed packet: {0}")]
    Decode(String),
}

/// Outbound capability of a mesh transport.
#[async_trait]
pub trait MeshTransport: Send + Sync {
    /// Transmit one text payload on the given channel slot.
    async fn send_text(&self, text: &str, channel_index: u32) -> Result<(), TransportError>;

    /// Release the connection. Later sends fail with [`TransportError::Closed`].
    async fn close(&self);

    /// Short transport name for logs.
    fn name(&self) -> &'static str;
}
