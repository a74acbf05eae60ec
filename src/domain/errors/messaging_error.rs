//! Messaging error types.

use thiserror::Error;

use super::TransportError;
use crate::domain::entities::{OrderId, ThreadId};

/// Errors surfaced by messaging store operations.
#[derive(Debug, Clone, Error)]
pub enum MessagingError {
    #[error("no active thread")]
    NoActiveThread,

    #[error("thread {thread_id} is read-only")]
    ThreadReadOnly { thread_id: ThreadId },

    #[error("thread {thread_id} is not loaded")]
    ThreadNotFound { thread_id: ThreadId },

    #[error("no thread for order {order_id} after {attempts} attempts")]
    ThreadNotCreated { order_id: OrderId, attempts: u32 },

    #[error("message text is empty")]
    EmptyMessage,

    #[error("invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// The store was cleared while the operation was in flight.
    #[error("session cleared while operation was in flight")]
    SessionCleared,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl MessagingError {
    #[must_use]
    pub fn invalid_transition(
        entity: &'static str,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Whether the user can clear the condition by retrying.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::ThreadNotCreated { .. } | Self::SessionCleared => true,
            Self::Transport(e) => e.is_recoverable(),
            Self::NoActiveThread
            | Self::ThreadReadOnly { .. }
            | Self::ThreadNotFound { .. }
            | Self::EmptyMessage
            | Self::InvalidTransition { .. } => false,
        }
    }

    /// Human-readable message stored on the shared error field.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NoActiveThread => "Open a conversation before sending a message.".to_string(),
            Self::ThreadReadOnly { .. } => {
                "This conversation is closed. The order has ended, so no new messages can be sent."
                    .to_string()
            }
            Self::ThreadNotFound { .. } => "This conversation is not available.".to_string(),
            Self::ThreadNotCreated { .. } => {
                "The chat for this order is not ready yet. Please try again in a moment."
                    .to_string()
            }
            Self::EmptyMessage => "Type a message before sending.".to_string(),
            Self::InvalidTransition { entity, from, to } => {
                format!("This {entity} cannot move from {from} to {to}.")
            }
            Self::SessionCleared => "You have been signed out.".to_string(),
            Self::Transport(e) => e.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_convert() {
        let error: MessagingError = TransportError::network("offline").into();
        assert!(error.is_recoverable());
        assert!(error.user_message().contains("Unable to reach the server"));
    }

    #[test]
    fn test_poll_exhaustion_is_recoverable() {
        let error = MessagingError::ThreadNotCreated {
            order_id: OrderId::new("o1"),
            attempts: 10,
        };
        assert!(error.is_recoverable());
        assert!(error.user_message().contains("try again"));
    }

    #[test]
    fn test_read_only_is_not_recoverable() {
        let error = MessagingError::ThreadReadOnly {
            thread_id: ThreadId::new("t1"),
        };
        assert!(!error.is_recoverable());
    }
}
