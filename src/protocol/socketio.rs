//! Engine.IO v4 / Socket.IO v5 text packet codec.
//!
//! Every websocket text frame is one Engine.IO packet: a type digit followed by
//! an optional payload. Engine `message` packets (`4`) carry one Socket.IO
//! packet:
//!
//! ```text
//! <type>[<attachments>-][<namespace>,][<ack id>][<json data>]
//!
//! 0{"sid":"a1","pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}   engine open
//! 2                                                                              engine ping
//! 40                                                                             connect "/"
//! 42["door_status",{"status":"open"}]                                            event
//! 42/admin,17["calibrate"]                                                       event, namespace + ack id
//! ```
//!
//! Binary packets (`5`, `6`) are rejected: the device service only sends JSON.

use crate::error::{ConsoleError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Default Socket.IO namespace.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Engine.IO `open` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine session id.
    pub sid: String,
    /// Transport upgrades offered by the server (empty on a websocket-only session).
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server ping period in milliseconds.
    pub ping_interval: u64,
    /// Grace period after a missed ping, in milliseconds.
    pub ping_timeout: u64,
    /// Largest payload the server accepts, in bytes.
    #[serde(default)]
    pub max_payload: u64,
}

impl Handshake {
    /// How long the client may go without hearing a ping before the link is dead.
    #[must_use]
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// One Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    /// `0`: session opened.
    Open(Handshake),
    /// `1`: server closes the session.
    Close,
    /// `2`: heartbeat request; must be answered with a pong.
    Ping(String),
    /// `3`: heartbeat reply.
    Pong(String),
    /// `4`: carries a Socket.IO packet.
    Message(String),
    /// `5`: transport upgrade.
    Upgrade,
    /// `6`: no-op.
    Noop,
}

impl EnginePacket {
    /// Parse a websocket text frame.
    pub fn parse(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ConsoleError::Protocol("empty engine packet".into()))?;
        let body = chars.as_str();

        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(body)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(body.to_string())),
            '3' => Ok(Self::Pong(body.to_string())),
            '4' => Ok(Self::Message(body.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(ConsoleError::Protocol(format!(
                "unknown engine packet type '{other}'"
            ))),
        }
    }

    /// Encode as a websocket text frame.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            // Clients never send `open`; the server's payload is not re-encoded.
            Self::Open(_) => "0".to_string(),
            Self::Close => "1".to_string(),
            Self::Ping(data) => format!("2{data}"),
            Self::Pong(data) => format!("3{data}"),
            Self::Message(data) => format!("4{data}"),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }
}

/// Socket.IO packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPacketKind {
    /// `0`: namespace connect (request from client, acknowledgement from server).
    Connect,
    /// `1`: namespace disconnect.
    Disconnect,
    /// `2`: event.
    Event,
    /// `3`: acknowledgement.
    Ack,
    /// `4`: namespace connect refused.
    ConnectError,
    /// `5`: event with binary attachments.
    BinaryEvent,
    /// `6`: acknowledgement with binary attachments.
    BinaryAck,
}

impl SocketPacketKind {
    fn from_digit(digit: char) -> Option<Self> {
        Some(match digit {
            '0' => Self::Connect,
            '1' => Self::Disconnect,
            '2' => Self::Event,
            '3' => Self::Ack,
            '4' => Self::ConnectError,
            '5' => Self::BinaryEvent,
            '6' => Self::BinaryAck,
            _ => return None,
        })
    }

    fn digit(self) -> char {
        match self {
            Self::Connect => '0',
            Self::Disconnect => '1',
            Self::Event => '2',
            Self::Ack => '3',
            Self::ConnectError => '4',
            Self::BinaryEvent => '5',
            Self::BinaryAck => '6',
        }
    }
}

/// One Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    /// Packet type.
    pub kind: SocketPacketKind,
    /// Namespace, `/` when omitted on the wire.
    pub namespace: String,
    /// Acknowledgement id, if the sender expects one.
    pub ack_id: Option<u64>,
    /// JSON data following the header.
    pub data: Option<Value>,
}

impl SocketPacket {
    /// Namespace connect request for `/`.
    #[must_use]
    pub fn connect() -> Self {
        Self {
            kind: SocketPacketKind::Connect,
            namespace: DEFAULT_NAMESPACE.to_string(),
            ack_id: None,
            data: None,
        }
    }

    /// Event on `/` with an optional single argument.
    #[must_use]
    pub fn event(name: &str, argument: Option<Value>) -> Self {
        let mut args = vec![Value::String(name.to_string())];
        args.extend(argument);
        Self {
            kind: SocketPacketKind::Event,
            namespace: DEFAULT_NAMESPACE.to_string(),
            ack_id: None,
            data: Some(Value::Array(args)),
        }
    }

    /// Parse the payload of an Engine.IO `message` packet.
    pub fn parse(packet: &str) -> Result<Self> {
        let mut rest = packet;

        let digit = rest
            .chars()
            .next()
            .ok_or_else(|| ConsoleError::Protocol("empty socket packet".into()))?;
        let kind = SocketPacketKind::from_digit(digit)
            .ok_or_else(|| ConsoleError::Protocol(format!("unknown socket packet type '{digit}'")))?;
        rest = &rest[digit.len_utf8()..];

        if matches!(kind, SocketPacketKind::BinaryEvent | SocketPacketKind::BinaryAck) {
            return Err(ConsoleError::Protocol(
                "binary socket packets are not supported".into(),
            ));
        }

        let namespace = if rest.starts_with('/') {
            let end = rest.find(',').unwrap_or(rest.len());
            let namespace = rest[..end].to_string();
            rest = rest.get(end + 1..).unwrap_or("");
            namespace
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let id = rest[..digits]
                .parse()
                .map_err(|e| ConsoleError::Protocol(format!("invalid ack id: {e}")))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest)?)
        };

        Ok(Self {
            kind,
            namespace,
            ack_id,
            data,
        })
    }

    /// Encode as the payload of an Engine.IO `message` packet.
    pub fn encode(&self) -> Result<String> {
        let mut out = String::new();
        out.push(self.kind.digit());
        if self.namespace != DEFAULT_NAMESPACE {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(id) = self.ack_id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = &self.data {
            out.push_str(&serde_json::to_string(data)?);
        }
        Ok(out)
    }

    /// Encode wrapped in an Engine.IO `message` packet, ready for the socket.
    pub fn to_frame(&self) -> Result<String> {
        Ok(EnginePacket::Message(self.encode()?).encode())
    }

    /// Split an event packet into its name and first argument.
    pub fn into_event(self) -> Result<(String, Option<Value>)> {
        let Some(Value::Array(args)) = self.data else {
            return Err(ConsoleError::Protocol("event data is not an array".into()));
        };
        let mut args = args.into_iter();
        let name = match args.next() {
            Some(Value::String(name)) => name,
            _ => return Err(ConsoleError::Protocol("event name missing".into())),
        };
        Ok((name, args.next()))
    }

    /// Error message carried by a `connect_error` packet.
    #[must_use]
    pub fn error_message(&self) -> String {
        match &self.data {
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("connection refused")
                .to_string(),
            Some(Value::String(message)) => message.clone(),
            _ => "connection refused".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_open() {
        let frame = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        match EnginePacket::parse(frame).unwrap() {
            EnginePacket::Open(handshake) => {
                assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
                assert_eq!(handshake.liveness_window(), Duration::from_secs(45));
            }
            other => panic!("expected open, got {other:?}"),
        }
    }

    #[test]
    fn test_ping_pong() {
        assert_eq!(EnginePacket::parse("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(EnginePacket::Pong(String::new()).encode(), "3");
        assert_eq!(EnginePacket::Pong("probe".into()).encode(), "3probe");
    }

    #[test]
    fn test_parse_unknown_engine_type() {
        assert!(EnginePacket::parse("9").is_err());
        assert!(EnginePacket::parse("").is_err());
    }

    #[test]
    fn test_connect_frames() {
        assert_eq!(SocketPacket::connect().to_frame().unwrap(), "40");

        let ack = SocketPacket::parse(r#"0{"sid":"abc"}"#).unwrap();
        assert_eq!(ack.kind, SocketPacketKind::Connect);
        assert_eq!(ack.namespace, "/");
    }

    #[test]
    fn test_event_roundtrip_shape() {
        let frame = SocketPacket::event("update_settings", Some(json!({"threshold": 30})))
            .to_frame()
            .unwrap();
        assert_eq!(frame, r#"42["update_settings",{"threshold":30}]"#);

        let frame = SocketPacket::event("calibrate", None).to_frame().unwrap();
        assert_eq!(frame, r#"42["calibrate"]"#);
    }

    #[test]
    fn test_parse_event_with_namespace_and_ack() {
        let packet = SocketPacket::parse(r#"2/admin,17["door_status",{"status":"open"}]"#).unwrap();
        assert_eq!(packet.kind, SocketPacketKind::Event);
        assert_eq!(packet.namespace, "/admin");
        assert_eq!(packet.ack_id, Some(17));

        let (name, arg) = packet.into_event().unwrap();
        assert_eq!(name, "door_status");
        assert_eq!(arg, Some(json!({"status": "open"})));
    }

    #[test]
    fn test_parse_rejects_binary() {
        assert!(SocketPacket::parse(r#"51-["frame",{"_placeholder":true,"num":0}]"#).is_err());
    }

    #[test]
    fn test_connect_error_message() {
        let packet = SocketPacket::parse(r#"4{"message":"Not authorized"}"#).unwrap();
        assert_eq!(packet.kind, SocketPacketKind::ConnectError);
        assert_eq!(packet.error_message(), "Not authorized");
    }

    #[test]
    fn test_event_without_name() {
        let packet = SocketPacket::parse("2[]").unwrap();
        assert!(packet.into_event().is_err());
    }
}
