//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Over the websocket transport every frame carries exactly one Engine.IO
//! packet, so no payload batching is handled here. Binary attachments are
//! not used by the marketplace backend and are rejected as protocol errors.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::constants::{EnginePacketType, SocketPacketType};
use super::error::{SocketError, SocketResult};

/// Body of the Engine.IO open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPayload {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl OpenPayload {
    /// Longest silence tolerated before the connection is considered dead.
    #[must_use]
    pub const fn ping_deadline(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(OpenPayload),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    /// # Errors
    /// Returns a protocol error for empty frames or unknown packet types.
    pub fn decode(frame: &str) -> SocketResult<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .and_then(|d| u8::try_from(d).ok())
            .and_then(EnginePacketType::from_u8)
            .ok_or_else(|| SocketError::protocol(format!("unknown engine packet: {frame:?}")))?;
        let body = chars.as_str();

        Ok(match kind {
            EnginePacketType::Open => {
                let payload = serde_json::from_str(body).map_err(|e| {
                    SocketError::serialization(format!("failed to parse open packet: {e}"))
                })?;
                Self::Open(payload)
            }
            EnginePacketType::Close => Self::Close,
            EnginePacketType::Ping => Self::Ping(body.to_string()),
            EnginePacketType::Pong => Self::Pong(body.to_string()),
            EnginePacketType::Message => Self::Message(body.to_string()),
            EnginePacketType::Upgrade => Self::Upgrade,
            EnginePacketType::Noop => Self::Noop,
        })
    }

    #[must_use]
    pub fn encode(&self) -> String {
        let (kind, body) = match self {
            Self::Open(_) => (EnginePacketType::Open, ""),
            Self::Close => (EnginePacketType::Close, ""),
            Self::Ping(data) => (EnginePacketType::Ping, data.as_str()),
            Self::Pong(data) => (EnginePacketType::Pong, data.as_str()),
            Self::Message(data) => (EnginePacketType::Message, data.as_str()),
            Self::Upgrade => (EnginePacketType::Upgrade, ""),
            Self::Noop => (EnginePacketType::Noop, ""),
        };

        let mut frame = String::with_capacity(body.len() + 1);
        frame.push(kind.as_char());
        frame.push_str(body);
        frame
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Option<Value>,
    },
}

impl SocketPacket {
    #[must_use]
    pub fn event(namespace: &str, name: &str, payload: Value) -> Self {
        Self::Event {
            namespace: namespace.to_string(),
            ack_id: None,
            name: name.to_string(),
            args: vec![payload],
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Human-readable reason carried by a `CONNECT_ERROR`.
    #[must_use]
    pub fn connect_error_message(&self) -> Option<String> {
        let Self::ConnectError { data, .. } = self else {
            return None;
        };
        Some(match data {
            Some(Value::String(message)) => message.clone(),
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("connection refused")
                .to_string(),
            _ => "connection refused".to_string(),
        })
    }

    /// # Errors
    /// Returns a protocol error for malformed or binary packets.
    pub fn decode(body: &str) -> SocketResult<Self> {
        let mut chars = body.chars();
        let kind = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .and_then(|d| u8::try_from(d).ok())
            .and_then(SocketPacketType::from_u8)
            .ok_or_else(|| SocketError::protocol(format!("unknown socket packet: {body:?}")))?;
        let rest = chars.as_str();

        if matches!(
            kind,
            SocketPacketType::BinaryEvent | SocketPacketType::BinaryAck
        ) {
            return Err(SocketError::protocol("binary packets are not supported"));
        }

        let (namespace, rest) = if rest.starts_with('/') {
            match rest.split_once(',') {
                Some((namespace, rest)) => (namespace.to_string(), rest),
                None => (rest.to_string(), ""),
            }
        } else {
            ("/".to_string(), rest)
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (ack_digits, json) = rest.split_at(digits);
        let ack_id = if ack_digits.is_empty() {
            None
        } else {
            Some(
                ack_digits
                    .parse::<u64>()
                    .map_err(|e| SocketError::protocol(format!("invalid ack id: {e}")))?,
            )
        };

        let data = if json.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(json).map_err(|e| {
                SocketError::serialization(format!("invalid packet payload: {e}"))
            })?)
        };

        match kind {
            SocketPacketType::Connect => Ok(Self::Connect { namespace, data }),
            SocketPacketType::Disconnect => Ok(Self::Disconnect { namespace }),
            SocketPacketType::ConnectError => Ok(Self::ConnectError { namespace, data }),
            SocketPacketType::Event => {
                let Some(Value::Array(mut items)) = data else {
                    return Err(SocketError::protocol("event payload is not an array"));
                };
                if items.is_empty() {
                    return Err(SocketError::protocol("event without a name"));
                }
                let Value::String(name) = items.remove(0) else {
                    return Err(SocketError::protocol("event name is not a string"));
                };
                Ok(Self::Event {
                    namespace,
                    ack_id,
                    name,
                    args: items,
                })
            }
            SocketPacketType::Ack => {
                let ack_id = ack_id.ok_or_else(|| SocketError::protocol("ack without an id"))?;
                let args = match data {
                    Some(Value::Array(items)) => items,
                    Some(other) => vec![other],
                    None => Vec::new(),
                };
                Ok(Self::Ack {
                    namespace,
                    ack_id,
                    args,
                })
            }
            SocketPacketType::BinaryEvent | SocketPacketType::BinaryAck => {
                Err(SocketError::protocol("binary packets are not supported"))
            }
        }
    }

    #[must_use]
    pub fn encode(&self) -> String {
        let (kind, ack_id, data) = match self {
            Self::Connect { data, .. } => (SocketPacketType::Connect, None, data.clone()),
            Self::Disconnect { .. } => (SocketPacketType::Disconnect, None, None),
            Self::Event {
                ack_id, name, args, ..
            } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                (SocketPacketType::Event, *ack_id, Some(Value::Array(items)))
            }
            Self::Ack { ack_id, args, .. } => (
                SocketPacketType::Ack,
                Some(*ack_id),
                Some(Value::Array(args.clone())),
            ),
            Self::ConnectError { data, .. } => {
                (SocketPacketType::ConnectError, None, data.clone())
            }
        };

        let mut out = String::new();
        out.push(kind.as_char());

        let namespace = self.namespace();
        if namespace != "/" {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(ack_id) = ack_id {
            out.push_str(&ack_id.to_string());
        }
        if let Some(data) = data {
            out.push_str(&data.to_string());
        }
        out
    }

    /// Wraps the packet in an Engine.IO message frame.
    #[must_use]
    pub fn to_frame(&self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_open_packet() {
        let frame = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        let EnginePacket::Open(open) = EnginePacket::decode(frame).unwrap() else {
            panic!("expected open packet");
        };
        assert_eq!(open.sid, "lv_VI97HAXpY6yYWAAAC");
        assert_eq!(open.ping_deadline(), Duration::from_secs(45));
    }

    #[test]
    fn test_ping_pong_and_unknown_frames() {
        assert_eq!(EnginePacket::decode("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(EnginePacket::Pong("upgrade".into()).encode(), "3upgrade");
        assert!(EnginePacket::decode("").is_err());
        assert!(EnginePacket::decode("x42").is_err());
    }

    #[test]
    fn test_encode_namespace_connect_with_auth() {
        let packet = SocketPacket::Connect {
            namespace: "/messaging".into(),
            data: Some(json!({ "token": "abc" })),
        };
        assert_eq!(packet.to_frame(), r#"40/messaging,{"token":"abc"}"#);
    }

    #[test]
    fn test_root_namespace_is_implicit() {
        let packet = SocketPacket::Disconnect {
            namespace: "/".into(),
        };
        assert_eq!(packet.encode(), "1");
        assert_eq!(SocketPacket::decode("1").unwrap(), packet);
    }

    #[test]
    fn test_decode_event_with_namespace() {
        let packet = SocketPacket::decode(
            r#"2/messaging,["new-message",{"threadId":"t1","message":{"id":"m1"}}]"#,
        )
        .unwrap();

        let SocketPacket::Event {
            namespace,
            ack_id,
            name,
            args,
        } = packet
        else {
            panic!("expected event");
        };
        assert_eq!(namespace, "/messaging");
        assert_eq!(ack_id, None);
        assert_eq!(name, "new-message");
        assert_eq!(args[0]["threadId"], "t1");
    }

    #[test]
    fn test_event_with_ack_id() {
        let packet = SocketPacket::Event {
            namespace: "/notifications".into(),
            ack_id: Some(12),
            name: "notification".into(),
            args: vec![json!({ "id": 1 })],
        };
        let encoded = packet.encode();
        assert_eq!(encoded, r#"2/notifications,12["notification",{"id":1}]"#);
        assert_eq!(SocketPacket::decode(&encoded).unwrap(), packet);
    }

    #[test]
    fn test_connect_error_message() {
        let packet =
            SocketPacket::decode(r#"4/messaging,{"message":"Authentication failed"}"#).unwrap();
        assert_eq!(
            packet.connect_error_message().as_deref(),
            Some("Authentication failed")
        );
    }

    #[test]
    fn test_malformed_packets_are_rejected() {
        assert!(SocketPacket::decode(r"2/messaging,{}").is_err());
        assert!(SocketPacket::decode(r"2/messaging,[1]").is_err());
        assert!(SocketPacket::decode(r#"51-["upload",{"_placeholder":true,"num":0}]"#).is_err());
        assert!(SocketPacket::decode("9").is_err());
    }
}
