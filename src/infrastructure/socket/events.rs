use serde::de::DeserializeOwned;
use serde_json::Value;

use super::constants::{
    EVENT_MESSAGE_READ, EVENT_NEW_MESSAGE, EVENT_NOTIFICATION, EVENT_NOTIFICATION_DELETED,
    EVENT_NOTIFICATION_READ, EVENT_NOTIFICATIONS_READ_ALL,
};
use super::error::{SocketError, SocketResult};
use crate::domain::ports::SocketEvent;

/// Commands sent from [`SocketChannel`](super::SocketChannel) handles to the
/// connection task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCommand {
    /// Room membership changed; emit the difference.
    SyncRooms,
    Disconnect,
}

pub struct EventParser;

impl EventParser {
    /// Parses a server-emitted event.
    ///
    /// Returns `Ok(None)` for events this client does not consume.
    ///
    /// # Errors
    /// Returns a serialization error when a known event has a malformed body.
    pub fn parse(name: &str, args: &[Value]) -> SocketResult<Option<SocketEvent>> {
        let event = match name {
            EVENT_NEW_MESSAGE => SocketEvent::NewMessage(Self::first_arg(name, args)?),
            EVENT_MESSAGE_READ => SocketEvent::MessageRead(Self::first_arg(name, args)?),
            EVENT_NOTIFICATION => SocketEvent::Notification(Self::first_arg(name, args)?),
            EVENT_NOTIFICATION_READ => SocketEvent::NotificationRead(Self::first_arg(name, args)?),
            EVENT_NOTIFICATIONS_READ_ALL => SocketEvent::NotificationsReadAll,
            EVENT_NOTIFICATION_DELETED => {
                SocketEvent::NotificationDeleted(Self::first_arg(name, args)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    fn first_arg<T: DeserializeOwned>(name: &str, args: &[Value]) -> SocketResult<T> {
        let payload = args
            .first()
            .cloned()
            .ok_or_else(|| SocketError::serialization(format!("{name} without payload")))?;
        serde_json::from_value(payload)
            .map_err(|e| SocketError::serialization(format!("failed to parse {name}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_new_message_with_numeric_ids() {
        let args = [json!({
            "threadId": 17,
            "message": {
                "id": 501,
                "senderId": 42,
                "kind": "text",
                "text": "On my way",
                "createdAt": "2026-03-01T09:30:00Z"
            }
        })];

        let Some(SocketEvent::NewMessage(event)) = EventParser::parse("new-message", &args).unwrap()
        else {
            panic!("expected new-message");
        };
        assert_eq!(event.thread_id, "17");
        assert_eq!(event.message.id, "501");
        assert_eq!(event.message.sender_id, "42");
    }

    #[test]
    fn test_parse_message_read() {
        let args = [json!({ "threadId": "t1", "userId": "u2" })];
        let event = EventParser::parse("message-read", &args).unwrap().unwrap();
        assert_eq!(event.thread_id().unwrap().as_str(), "t1");
    }

    #[test]
    fn test_parse_notification_events() {
        let read = EventParser::parse("notification.read", &[json!({ "notificationId": 9 })])
            .unwrap()
            .unwrap();
        assert!(matches!(read, SocketEvent::NotificationRead(r) if r.id == "9"));

        let all = EventParser::parse("notifications.read_all", &[]).unwrap().unwrap();
        assert!(matches!(all, SocketEvent::NotificationsReadAll));
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        assert!(EventParser::parse("typing", &[json!({})]).unwrap().is_none());
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(EventParser::parse("new-message", &[]).is_err());
        assert!(EventParser::parse("message-read", &[json!({ "threadId": "t1" })]).is_err());
    }
}
