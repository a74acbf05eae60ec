use thiserror::Error;

pub type SocketResult<T> = Result<T, SocketError>;

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("connection closed with code {code}: {reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("websocket error: {message}")]
    WebSocket { message: String },

    /// The namespace refused the connection (`CONNECT_ERROR`).
    #[error("namespace {namespace} rejected connection: {message}")]
    Rejected { namespace: String, message: String },

    /// The server disconnected the namespace on purpose.
    #[error("server closed namespace {namespace}")]
    ServerDisconnect { namespace: String },

    #[error("no ping from server within {timeout_ms}ms")]
    PingTimeout { timeout_ms: u64 },

    #[error("reconnection limit exceeded after {attempts} attempts")]
    ReconnectionLimitExceeded { attempts: u32 },

    #[error("serialization error: {message}")]
    Serialization { message: String },

    #[error("protocol error: {message}")]
    Protocol { message: String },

    #[error("timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("invalid socket url: {message}")]
    InvalidUrl { message: String },

    #[error("no credentials available for socket connection")]
    NoCredentials,

    #[error("not connected")]
    NotConnected,

    #[error("already connecting or connected")]
    AlreadyConnected,
}

impl SocketError {
    #[must_use]
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocket {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Whether the reconnect loop should try again after this error.
    #[must_use]
    pub const fn should_reconnect(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. }
            | Self::ConnectionClosed { .. }
            | Self::WebSocket { .. }
            | Self::PingTimeout { .. }
            | Self::Protocol { .. }
            | Self::Timeout { .. } => true,

            Self::Rejected { .. }
            | Self::ServerDisconnect { .. }
            | Self::ReconnectionLimitExceeded { .. }
            | Self::Serialization { .. }
            | Self::InvalidUrl { .. }
            | Self::NoCredentials
            | Self::NotConnected
            | Self::AlreadyConnected => false,
        }
    }

    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::NoCredentials)
    }

    #[must_use]
    pub const fn close_code(&self) -> Option<u16> {
        if let Self::ConnectionClosed { code, .. } = self {
            Some(*code)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(SocketError::connection_failed("refused"), true ; "connect_failure")]
    #[test_case(SocketError::PingTimeout { timeout_ms: 45_000 }, true ; "ping_timeout")]
    #[test_case(SocketError::timeout("open packet"), true ; "handshake_timeout")]
    #[test_case(SocketError::Rejected { namespace: "/messaging".into(), message: "jwt expired".into() }, false ; "rejected")]
    #[test_case(SocketError::ServerDisconnect { namespace: "/messaging".into() }, false ; "server_disconnect")]
    #[test_case(SocketError::NoCredentials, false ; "no_credentials")]
    fn test_should_reconnect(error: SocketError, expected: bool) {
        assert_eq!(error.should_reconnect(), expected);
    }

    #[test]
    fn test_close_code() {
        let error = SocketError::ConnectionClosed {
            code: 1006,
            reason: "abnormal".into(),
        };
        assert_eq!(error.close_code(), Some(1006));
        assert!(SocketError::NoCredentials.is_auth_failure());
        assert_eq!(SocketError::NotConnected.close_code(), None);
    }
}
