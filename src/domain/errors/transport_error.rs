//! HTTP transport error types.

use serde_json::Value;
use thiserror::Error;

/// Errors raised by the REST transport.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Non-2xx response, with the structured error body when the server sent one.
    #[error("request failed with status {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Http {
        status: u16,
        error_id: Option<String>,
        kind: Option<String>,
        message: Option<String>,
        details: Option<Value>,
    },

    /// No response at all: DNS, connect, TLS or timeout failure.
    #[error("network error: {message}")]
    Network { message: String },

    /// Response body did not match the expected shape.
    #[error("failed to decode response: {message}")]
    Decode { message: String },

    /// No bearer token is known for the current session.
    #[error("no credentials available for request")]
    NoCredentials,

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl TransportError {
    /// Creates an HTTP error carrying only a status code.
    #[must_use]
    pub const fn status(status: u16) -> Self {
        Self::Http {
            status,
            error_id: None,
            kind: None,
            message: None,
            details: None,
        }
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// HTTP status code, if the server answered.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        if let Self::Http { status, .. } = self {
            Some(*status)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. } | Self::NoCredentials)
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Http { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::Decode { .. } | Self::NoCredentials | Self::InvalidRequest { .. } => false,
        }
    }

    /// Message suitable for an error banner.
    ///
    /// Prefers the server-provided message; network failures get a generic
    /// connectivity message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            Self::Http { status: 401, .. } | Self::NoCredentials => {
                "Your session has expired. Please sign in again.".to_string()
            }
            Self::Http { status: 403, .. } => {
                "You do not have access to this conversation.".to_string()
            }
            Self::Http { status: 404, .. } => "The requested item was not found.".to_string(),
            Self::Http { status, .. } if *status >= 500 => {
                "The server is having trouble right now. Please try again.".to_string()
            }
            Self::Http { status, .. } => format!("Request failed (HTTP {status})."),
            Self::Network { .. } => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            Self::Decode { .. } | Self::InvalidRequest { .. } => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}
