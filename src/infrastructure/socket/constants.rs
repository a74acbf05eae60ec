use std::time::Duration;

pub const ENGINE_IO_PATH: &str = "/socket.io/";
pub const ENGINE_IO_VERSION: u8 = 4;

pub const MESSAGING_NAMESPACE: &str = "/messaging";
pub const NOTIFICATIONS_NAMESPACE: &str = "/notifications";

pub const RECONNECT_DELAY_BASE: Duration = Duration::from_secs(1);
pub const RECONNECT_DELAY_MAX: Duration = Duration::from_secs(30);
pub const RECONNECT_JITTER_MAX: Duration = Duration::from_millis(500);
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(20);
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Used until the server's open packet says otherwise.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(25);
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(20);

pub const EVENT_JOIN_THREAD: &str = "join-thread";
pub const EVENT_LEAVE_THREAD: &str = "leave-thread";

pub const EVENT_NEW_MESSAGE: &str = "new-message";
pub const EVENT_MESSAGE_READ: &str = "message-read";
pub const EVENT_NOTIFICATION: &str = "notification";
pub const EVENT_NOTIFICATION_READ: &str = "notification.read";
pub const EVENT_NOTIFICATIONS_READ_ALL: &str = "notifications.read_all";
pub const EVENT_NOTIFICATION_DELETED: &str = "notification.deleted";

/// Engine.IO packet types, sent as the first character of a frame.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnginePacketType {
    Open = 0,
    Close = 1,
    Ping = 2,
    Pong = 3,
    Message = 4,
    Upgrade = 5,
    Noop = 6,
}

impl EnginePacketType {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Open),
            1 => Some(Self::Close),
            2 => Some(Self::Ping),
            3 => Some(Self::Pong),
            4 => Some(Self::Message),
            5 => Some(Self::Upgrade),
            6 => Some(Self::Noop),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_char(self) -> char {
        (b'0' + self as u8) as char
    }
}

/// Socket.IO packet types, carried inside an Engine.IO message.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketPacketType {
    Connect = 0,
    Disconnect = 1,
    Event = 2,
    Ack = 3,
    ConnectError = 4,
    BinaryEvent = 5,
    BinaryAck = 6,
}

impl SocketPacketType {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Connect),
            1 => Some(Self::Disconnect),
            2 => Some(Self::Event),
            3 => Some(Self::Ack),
            4 => Some(Self::ConnectError),
            5 => Some(Self::BinaryEvent),
            6 => Some(Self::BinaryAck),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_char(self) -> char {
        (b'0' + self as u8) as char
    }
}
