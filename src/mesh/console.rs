//! Console transport: stdin/stdout for local development.
//!
//! Every stdin line becomes a text message on the configured slot, stamped
//! with the current time. Outbound text is printed as `[ch<N>] <text>`.

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{EventStream, InboundEvent, MeshTransport, TransportError, EVENT_CHANNEL_CAPACITY};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Line-oriented local transport.
pub struct ConsoleTransport {
    output: Mutex<Option<BoxedWriter>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ConsoleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleTransport").finish_non_exhaustive()
    }
}

impl ConsoleTransport {
    /// Attach to the process stdin and stdout.
    pub fn stdio(channel_slot: u32) -> (Self, EventStream) {
        Self::from_io(tokio::io::stdin(), tokio::io::stdout(), channel_slot)
    }

    /// Attach to arbitrary line input and output streams.
    pub fn from_io<R, W>(input: R, output: W, channel_slot: u32) -> (Self, EventStream)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let handle = tokio::spawn(async move {
            let mut lines = BufReader::new(input).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let event = InboundEvent::text(line, channel_slot, Some(Utc::now()));
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            debug!("console input ended");
        });
        let transport = Self {
            output: Mutex::new(Some(Box::new(output))),
            reader: Mutex::new(Some(handle)),
        };
        (transport, rx)
    }
}

#[async_trait]
impl MeshTransport for ConsoleTransport {
    async fn send_text(&self, text: &str, channel_index: u32) -> Result<(), TransportError> {
        let line = format!("[ch{channel_index}] {text}\n");
        let mut guard = self.output.lock().await;
        let output = guard.as_mut().ok_or(TransportError::Closed)?;
        output
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        output
            .flush()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&self) {
        self.output.lock().await.take();
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
