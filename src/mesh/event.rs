//! Inbound packet model and decoding.
//!
//! Packets arrive as JSON objects shaped like the mesh client's decoded packet
//! dictionaries:
//!
//! ```json
//! {"rxTime": 1718000000, "decoded": {"portnum": "TEXT_MESSAGE_APP", "channelIndex": 0, "text": "ping"}}
//! ```
//!
//! They are decoded once, here, into [`InboundEvent`].

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::TransportError;

/// Numeric application port of plain text messages.
pub const TEXT_MESSAGE_PORT: u64 = 1;

/// Symbolic application port of plain text messages.
pub const TEXT_MESSAGE_PORT_NAME: &str = "TEXT_MESSAGE_APP";

/// Application port identifier as surfaced by the transport.
///
/// Depending on the decode path the same port shows up either as its
/// protobuf number or as its enum name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortNum {
    /// Protobuf enum value.
    Numeric(u64),
    /// Protobuf enum name.
    Symbolic(String),
}

impl PortNum {
    /// Whether this port carries plain text messages, in either form.
    pub fn is_text_message(&self) -> bool {
        match self {
            Self::Numeric(n) => *n == TEXT_MESSAGE_PORT,
            Self::Symbolic(name) => name == TEXT_MESSAGE_PORT_NAME,
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Self::Numeric),
            Value::String(s) => Some(Self::Symbolic(s.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for PortNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Symbolic(name) => f.write_str(name),
        }
    }
}

/// One decoded mesh packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Receipt time reported by the radio. Absent when the radio did not stamp it.
    pub rx_time: Option<DateTime<Utc>>,
    /// Logical channel slot. Defaults to `Some(0)` when the packet omits it.
    /// `None` when the packet carries a value that is not a slot number, so
    /// the event matches no slot.
    pub channel_index: Option<u32>,
    /// Application port of the decoded payload.
    pub portnum: Option<PortNum>,
    /// Text body for text payloads.
    pub text: Option<String>,
}

impl InboundEvent {
    /// Build a plain text event, as a radio would deliver it.
    pub fn text(
        text: impl Into<String>,
        channel_index: u32,
        rx_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            rx_time,
            channel_index: Some(channel_index),
            portnum: Some(PortNum::Symbolic(TEXT_MESSAGE_PORT_NAME.to_owned())),
            text: Some(text.into()),
        }
    }

    /// Decode a packet object.
    ///
    /// Unknown fields are ignored. `rxTime` may be integral or fractional
    /// seconds; zero counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Decode`] when the value is not an object.
    pub fn from_packet(packet: &Value) -> Result<Self, TransportError> {
        let obj = packet
            .as_object()
            .ok_or_else(|| TransportError::Decode("packet is not a JSON object".to_owned()))?;

        let rx_time = obj.get("rxTime").and_then(rx_time_from_json);

        let decoded = obj.get("decoded");
        let field = |name: &str| decoded.and_then(|d| d.get(name));

        let channel_index = match field("channelIndex") {
            None | Some(Value::Null) => Some(0),
            Some(value) => value.as_u64().and_then(|n| u32::try_from(n).ok()),
        };
        let portnum = field("portnum").and_then(PortNum::from_json);
        let text = field("text").and_then(Value::as_str).map(ToOwned::to_owned);

        Ok(Self {
            rx_time,
            channel_index,
            portnum,
            text,
        })
    }

    /// Decode one line of newline-delimited JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Decode`] on invalid JSON or a non-object value.
    pub fn from_json_line(line: &str) -> Result<Self, TransportError> {
        let value: Value =
            serde_json::from_str(line).map_err(|e| TransportError::Decode(e.to_string()))?;
        Self::from_packet(&value)
    }
}

fn rx_time_from_json(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(secs) = value.as_i64() {
        return if secs == 0 {
            None
        } else {
            DateTime::from_timestamp(secs, 0)
        };
    }
    let secs = value.as_f64().filter(|secs| *secs != 0.0)?;
    // Float-to-int casts saturate; chrono rejects anything out of range.
    #[allow(clippy::cast_possible_truncation)]
    let millis = (secs * 1000.0).trunc() as i64;
    DateTime::from_timestamp_millis(millis)
}
