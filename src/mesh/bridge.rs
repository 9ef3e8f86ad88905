//! TCP bridge transport speaking newline-delimited JSON.
//!
//! Inbound lines are packet objects (see [`super::event`]). Outbound lines are
//! `{"type":"sendText","text":...,"channelIndex":...}`.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::{EventStream, InboundEvent, MeshTransport, TransportError, EVENT_CHANNEL_CAPACITY};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Transport backed by a JSON-lines bridge connection.
pub struct BridgeTransport {
    writer: Mutex<Option<BoxedWriter>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for BridgeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeTransport").finish_non_exhaustive()
    }
}

impl BridgeTransport {
    /// Dial the bridge and start reading packets.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] when the TCP connection fails.
    pub async fn connect(host: &str, port: u16) -> Result<(Self, EventStream), TransportError> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;
        info!(%addr, "connected to mesh bridge");
        let (read_half, write_half) = stream.into_split();
        Ok(Self::from_io(read_half, write_half))
    }

    /// Wrap an already-established byte stream.
    pub fn from_io<R, W>(reader: R, writer: W) -> (Self, EventStream)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let handle = tokio::spawn(read_packets(reader, tx));
        let transport = Self {
            writer: Mutex::new(Some(Box::new(writer))),
            reader: Mutex::new(Some(handle)),
        };
        (transport, rx)
    }
}

async fn read_packets<R>(reader: R, tx: mpsc::Sender<InboundEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("mesh bridge closed the connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "mesh bridge read failed");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        trace!(raw = %line, "raw packet");

        match InboundEvent::from_json_line(line) {
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    debug!("event subscriber dropped, stopping reader");
                    break;
                }
            }
            Err(e) => warn!(error = %e, "skipping undecodable packet"),
        }
    }
}

#[async_trait]
impl MeshTransport for BridgeTransport {
    async fn send_text(&self, text: &str, channel_index: u32) -> Result<(), TransportError> {
        let mut line = serde_json::json!({
            "type": "sendText",
            "text": text,
            "channelIndex": channel_index,
        })
        .to_string();
        line.push('\n');

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::Closed)?;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                debug!(error = %e, "bridge writer shutdown failed");
            }
        }
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }
        info!("mesh bridge transport closed");
    }

    fn name(&self) -> &'static str {
        "bridge"
    }
}
