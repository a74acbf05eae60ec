//! Chat message entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::string_id;
use super::{ThreadId, UserId};

string_id!(
    /// Unique identifier for a message, server-assigned and unique per thread.
    MessageId
);

impl MessageId {
    /// Id of the local system banner for a thread.
    ///
    /// Deterministic so the banner can only ever exist once per thread.
    #[must_use]
    pub fn system_banner(thread_id: &ThreadId) -> Self {
        Self::new(format!("local-system-{thread_id}"))
    }
}

/// Delivery status of a message.
///
/// Ordered: `Sent < Delivered < Read`. Status only ever moves forward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Sent,
    Delivered,
    Read,
}

/// Kind discriminator for message payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    File,
}

/// Kind-specific message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text {
        text: String,
    },
    Image {
        url: String,
        caption: Option<String>,
    },
    File {
        url: String,
        file_name: String,
        size: Option<u64>,
    },
}

impl MessageBody {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Text { .. } => MessageKind::Text,
            Self::Image { .. } => MessageKind::Image,
            Self::File { .. } => MessageKind::File,
        }
    }

    /// Short human-readable preview of the payload.
    #[must_use]
    pub fn preview(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Image { caption, .. } => caption
                .as_ref()
                .map_or_else(|| "[image]".to_string(), |c| format!("[image] {c}")),
            Self::File { file_name, .. } => format!("[file] {file_name}"),
        }
    }
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    thread_id: ThreadId,
    sender_id: UserId,
    body: MessageBody,
    created_at: DateTime<Utc>,
    status: MessageStatus,
    local: bool,
}

impl Message {
    #[must_use]
    pub const fn new(
        id: MessageId,
        thread_id: ThreadId,
        sender_id: UserId,
        body: MessageBody,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            thread_id,
            sender_id,
            body,
            created_at,
            status: MessageStatus::Sent,
            local: false,
        }
    }

    /// Builds the non-persisted banner explaining why a new thread exists.
    #[must_use]
    pub fn system_banner(thread_id: &ThreadId, display_ref: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::system_banner(thread_id),
            thread_id: thread_id.clone(),
            sender_id: UserId::system(),
            body: MessageBody::text(format!(
                "Order created for request {display_ref}. Use this chat to coordinate the job."
            )),
            created_at: now,
            status: MessageStatus::Read,
            local: true,
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub const fn id(&self) -> &MessageId {
        &self.id
    }

    #[must_use]
    pub const fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    #[must_use]
    pub const fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    #[must_use]
    pub const fn body(&self) -> &MessageBody {
        &self.body
    }

    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn status(&self) -> MessageStatus {
        self.status
    }

    /// True for messages that exist only in local state.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.local
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        self.sender_id.is_system()
    }

    #[must_use]
    pub fn is_from(&self, user_id: &UserId) -> bool {
        &self.sender_id == user_id
    }

    /// Moves the status forward. Returns false if `next` would regress it.
    pub fn advance_status(&mut self, next: MessageStatus) -> bool {
        if next > self.status {
            self.status = next;
            true
        } else {
            false
        }
    }
}
