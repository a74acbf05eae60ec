//! Socket channel port and the events it delivers.

use crate::domain::connection::ConnectionStatus;
use crate::domain::entities::ThreadId;
use crate::domain::wire::{
    MessageReadEvent, NewMessageEvent, NotificationPayload, NotificationRef,
};

/// Event delivered by a socket namespace.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// Namespace handshake completed (first connect or after a reconnect).
    Connected {
        sid: String,
        reconnected: bool,
    },
    Disconnected {
        reason: String,
    },
    Reconnecting {
        attempt: u32,
    },
    NewMessage(NewMessageEvent),
    MessageRead(MessageReadEvent),
    Notification(NotificationPayload),
    NotificationRead(NotificationRef),
    NotificationsReadAll,
    NotificationDeleted(NotificationRef),
    Error {
        message: String,
        recoverable: bool,
    },
}

impl SocketEvent {
    #[must_use]
    pub const fn is_connection_event(&self) -> bool {
        matches!(
            self,
            Self::Connected { .. } | Self::Disconnected { .. } | Self::Reconnecting { .. }
        )
    }

    /// Thread the event belongs to, for messaging events.
    #[must_use]
    pub fn thread_id(&self) -> Option<ThreadId> {
        match self {
            Self::NewMessage(event) => Some(ThreadId::new(&event.thread_id)),
            Self::MessageRead(event) => Some(ThreadId::new(&event.thread_id)),
            _ => None,
        }
    }
}

/// Control surface of one connected socket namespace.
///
/// Room calls are non-blocking: membership is recorded immediately and the
/// join/leave frames are emitted by the channel task, which also re-emits
/// joins after every reconnect.
pub trait SocketPort: Send + Sync {
    /// Joins the room for `thread_id`. Joining twice is a no-op.
    fn join_room(&self, thread_id: &ThreadId);

    fn leave_room(&self, thread_id: &ThreadId);

    fn leave_all_rooms(&self);

    /// Closes the connection and stops reconnecting.
    fn disconnect(&self);

    fn status(&self) -> ConnectionStatus;
}
