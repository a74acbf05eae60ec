//! Backend wire shapes.
//!
//! These mirror the JSON the marketplace API and socket namespaces emit. They
//! are deliberately permissive (ids may be strings or numbers, most fields are
//! optional) and are only ever turned into entities by the thread adapter.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entities::{MessageKind, MessageStatus, OrderStatus, RequestStatus, ThreadStatus};
use super::serde_utils::string_or_number;

/// `GET /threads` response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadPage {
    pub data: Vec<ThreadSummary>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
}

/// A participant as embedded in a thread summary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    #[serde(with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "name")]
    pub display_name: Option<String>,
}

/// Thread as listed by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    #[serde(with = "string_or_number")]
    pub id: String,
    #[serde(default, with = "string_or_number::option")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub participants: Vec<ParticipantSummary>,
    #[serde(default)]
    pub status: ThreadStatus,
    #[serde(default)]
    pub order_status: Option<OrderStatus>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    /// Unread counters keyed by viewer id.
    #[serde(default)]
    pub unread_counts: HashMap<String, u32>,
}

/// `GET /threads/{id}/messages` response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub data: Vec<ChatMessage>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Message as sent by the backend, over REST or the socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(with = "string_or_number")]
    pub id: String,
    #[serde(default, with = "string_or_number::option")]
    pub thread_id: Option<String>,
    #[serde(with = "string_or_number")]
    pub sender_id: String,
    #[serde(default = "default_kind")]
    pub kind: MessageKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: MessageStatus,
}

const fn default_kind() -> MessageKind {
    MessageKind::Text
}

/// `POST /threads/{id}/messages` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl OutgoingMessage {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            text: text.into(),
        }
    }
}

/// `GET /orders/{id}` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResource {
    #[serde(with = "string_or_number")]
    pub id: String,
    #[serde(default, with = "string_or_number::option")]
    pub request_id: Option<String>,
    pub status: OrderStatus,
}

/// `POST /requests/{id}/accept` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptApplication {
    pub application_id: String,
}

/// `POST /requests/{id}/accept` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedRequest {
    #[serde(with = "string_or_number")]
    pub request_id: String,
    pub status: RequestStatus,
    #[serde(with = "string_or_number")]
    pub order_id: String,
    /// Short human-facing reference such as `R-AB12CD`.
    #[serde(default)]
    pub reference: Option<String>,
}

/// Structured error body returned on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error_id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
}

/// `new-message` socket payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessageEvent {
    #[serde(with = "string_or_number")]
    pub thread_id: String,
    pub message: ChatMessage,
}

/// `message-read` socket payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReadEvent {
    #[serde(with = "string_or_number")]
    pub thread_id: String,
    #[serde(with = "string_or_number")]
    pub user_id: String,
}

/// `notification` socket payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    #[serde(with = "string_or_number")]
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "message")]
    pub body: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "isRead")]
    pub read: bool,
}

/// Payload of `notification.read` and `notification.deleted`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRef {
    #[serde(with = "string_or_number", alias = "notificationId")]
    pub id: String,
}
