//! In-app notification entity.

use chrono::{DateTime, Utc};

use super::id::string_id;

string_id!(
    /// Unique identifier for an in-app notification.
    NotificationId
);

/// A notification delivered on the notifications channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxNotification {
    pub id: NotificationId,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl InboxNotification {
    #[must_use]
    pub fn new(
        id: NotificationId,
        kind: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            title: title.into(),
            body: body.into(),
            created_at,
            read: false,
        }
    }

    #[must_use]
    pub const fn with_read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }
}
