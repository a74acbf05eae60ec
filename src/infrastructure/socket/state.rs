use std::time::{Duration, Instant};

use super::constants::{DEFAULT_PING_INTERVAL, DEFAULT_PING_TIMEOUT};
use crate::domain::connection::ConnectionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    /// Waiting for the Engine.IO open packet.
    AwaitingOpen,
    /// Waiting for the namespace `CONNECT` acknowledgement.
    JoiningNamespace,
    Connected,
    Reconnecting {
        attempt: u32,
    },
    Failed,
    ShuttingDown,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::AwaitingOpen | Self::JoiningNamespace | Self::Connected
        )
    }

    /// Coarse status exposed through the socket port.
    #[must_use]
    pub const fn status(&self) -> ConnectionStatus {
        match self {
            Self::Disconnected | Self::ShuttingDown => ConnectionStatus::Disconnected,
            Self::Connecting | Self::AwaitingOpen | Self::JoiningNamespace => {
                ConnectionStatus::Connecting
            }
            Self::Connected => ConnectionStatus::Connected,
            Self::Reconnecting { .. } => ConnectionStatus::Reconnecting,
            Self::Failed => ConnectionStatus::Failed,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::AwaitingOpen => write!(f, "Awaiting open"),
            Self::JoiningNamespace => write!(f, "Joining namespace"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting { attempt } => write!(f, "Reconnecting (attempt {attempt})"),
            Self::Failed => write!(f, "Failed"),
            Self::ShuttingDown => write!(f, "Shutting down"),
        }
    }
}

/// Per-connection bookkeeping for one namespace.
pub struct ChannelState {
    connection: ConnectionState,
    sid: Option<String>,
    ping_interval: Duration,
    ping_timeout: Duration,
    last_ping: Option<Instant>,
    connected_at: Option<Instant>,
}

impl ChannelState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            sid: None,
            ping_interval: DEFAULT_PING_INTERVAL,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            last_ping: None,
            connected_at: None,
        }
    }

    #[must_use]
    pub const fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub const fn transition_to_connecting(&mut self) {
        self.connection = ConnectionState::Connecting;
    }

    pub const fn transition_to_awaiting_open(&mut self) {
        self.connection = ConnectionState::AwaitingOpen;
    }

    pub fn transition_to_joining(&mut self, ping_interval: Duration, ping_timeout: Duration) {
        self.connection = ConnectionState::JoiningNamespace;
        self.ping_interval = ping_interval;
        self.ping_timeout = ping_timeout;
        self.last_ping = Some(Instant::now());
    }

    pub fn transition_to_connected(&mut self, sid: String) {
        self.connection = ConnectionState::Connected;
        self.sid = Some(sid);
        self.connected_at = Some(Instant::now());
        self.last_ping = Some(Instant::now());
    }

    pub fn transition_to_disconnected(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.sid = None;
        self.last_ping = None;
        self.connected_at = None;
    }

    pub const fn transition_to_shutdown(&mut self) {
        self.connection = ConnectionState::ShuttingDown;
    }

    pub fn record_ping(&mut self) {
        self.last_ping = Some(Instant::now());
    }

    #[must_use]
    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    /// Instant after which a missing ping means the server is gone.
    #[must_use]
    pub fn ping_deadline(&self) -> Option<Instant> {
        self.last_ping
            .map(|at| at + self.ping_interval + self.ping_timeout)
    }

    #[must_use]
    pub const fn ping_window(&self) -> Duration {
        self.ping_interval.saturating_add(self.ping_timeout)
    }

    #[must_use]
    pub fn uptime(&self) -> Option<Duration> {
        self.connected_at.map(|at| at.elapsed())
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::AwaitingOpen.to_string(), "Awaiting open");
        assert_eq!(
            ConnectionState::Reconnecting { attempt: 3 }.to_string(),
            "Reconnecting (attempt 3)"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ConnectionState::JoiningNamespace.status(),
            ConnectionStatus::Connecting
        );
        assert_eq!(ConnectionState::Failed.status(), ConnectionStatus::Failed);
        assert!(ConnectionState::JoiningNamespace.is_active());
        assert!(!ConnectionState::Reconnecting { attempt: 1 }.is_active());
    }

    #[test]
    fn test_channel_state_transitions() {
        let mut state = ChannelState::new();
        assert!(state.ping_deadline().is_none());

        state.transition_to_connecting();
        state.transition_to_awaiting_open();
        state.transition_to_joining(Duration::from_millis(100), Duration::from_millis(50));
        assert_eq!(state.ping_window(), Duration::from_millis(150));
        assert!(state.ping_deadline().is_some());

        state.transition_to_connected("sid-1".to_string());
        assert!(state.connection().is_connected());
        assert_eq!(state.sid(), Some("sid-1"));
        assert!(state.uptime().is_some());

        state.transition_to_disconnected();
        assert_eq!(state.connection(), ConnectionState::Disconnected);
        assert!(state.sid().is_none());
    }
}
