//! Reply chunking and paced transmission.
//!
//! Replies can be far longer than one mesh packet. They are split with
//! [`chunk_text`] and sent strictly in order, with a fixed pause between
//! consecutive sends so the radio queue is not flooded.

use std::time::Duration;

use tracing::{debug, warn};

use crate::mesh::MeshTransport;

pub mod chunker;

pub use chunker::chunk_text;

/// Pause between consecutive chunk sends.
pub const PACING_DELAY: Duration = Duration::from_millis(200);

/// Result of sending one reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReport {
    /// Number of chunks handed to the transport successfully.
    pub sent: usize,
    /// Zero-based indices of chunks whose send failed.
    pub failed: Vec<usize>,
}

impl SendReport {
    /// Total number of send attempts.
    pub fn attempted(&self) -> usize {
        self.sent.saturating_add(self.failed.len())
    }
}

/// Send `chunks` in order on `channel_index`, pausing `pacing` between sends.
///
/// A failed send is logged and the remaining chunks are still attempted.
pub async fn send_chunks(
    transport: &dyn MeshTransport,
    chunks: &[String],
    channel_index: u32,
    pacing: Duration,
) -> SendReport {
    let mut report = SendReport::default();
    for (index, chunk) in chunks.iter().enumerate() {
        if index > 0 && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
        match transport.send_text(chunk, channel_index).await {
            Ok(()) => {
                debug!(index, len = chunk.len(), channel_index, "chunk sent");
                report.sent = report.sent.saturating_add(1);
            }
            Err(e) => {
                warn!(index, error = %e, transport = transport.name(), "failed to send chunk");
                report.failed.push(index);
            }
        }
    }
    report
}

/// Chunk `text` to `max_len` and send it. See [`send_chunks`].
pub async fn send_reply(
    transport: &dyn MeshTransport,
    text: &str,
    max_len: usize,
    channel_index: u32,
    pacing: Duration,
) -> SendReport {
    let chunks = chunk_text(text, max_len);
    send_chunks(transport, &chunks, channel_index, pacing).await
}
