//! Chat thread entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::string_id;
use super::{OrderId, OrderStatus, UserId};

string_id!(
    /// Unique identifier for a chat thread.
    ThreadId
);

/// Moderation status of a thread, independent of its order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    #[default]
    Open,
    Archived,
    Blocked,
}

impl ThreadStatus {
    /// Returns true if the status alone forbids new messages.
    #[must_use]
    pub const fn is_frozen(self) -> bool {
        matches!(self, Self::Archived | Self::Blocked)
    }
}

/// A two-party conversation bound to an order.
///
/// Read-only state is never stored: [`Thread::is_read_only`] derives it from
/// the thread status and the freshest known status of the bound order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    id: ThreadId,
    order_id: OrderId,
    title: String,
    participant_ids: [UserId; 2],
    status: ThreadStatus,
    order_status: Option<OrderStatus>,
    last_message_at: Option<DateTime<Utc>>,
    unread_count: u32,
}

impl Thread {
    /// Creates a thread with no unread messages and unknown order status.
    #[must_use]
    pub fn new(
        id: ThreadId,
        order_id: OrderId,
        title: impl Into<String>,
        participant_ids: [UserId; 2],
    ) -> Self {
        Self {
            id,
            order_id,
            title: title.into(),
            participant_ids,
            status: ThreadStatus::Open,
            order_status: None,
            last_message_at: None,
            unread_count: 0,
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: ThreadStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub const fn with_order_status(mut self, status: Option<OrderStatus>) -> Self {
        self.order_status = status;
        self
    }

    #[must_use]
    pub const fn with_last_message_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_message_at = at;
        self
    }

    #[must_use]
    pub const fn with_unread_count(mut self, count: u32) -> Self {
        self.unread_count = count;
        self
    }

    #[must_use]
    pub const fn id(&self) -> &ThreadId {
        &self.id
    }

    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Display name of the counter-party.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn participant_ids(&self) -> &[UserId; 2] {
        &self.participant_ids
    }

    #[must_use]
    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.participant_ids.contains(user_id)
    }

    #[must_use]
    pub const fn status(&self) -> ThreadStatus {
        self.status
    }

    #[must_use]
    pub const fn order_status(&self) -> Option<OrderStatus> {
        self.order_status
    }

    #[must_use]
    pub const fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.last_message_at
    }

    #[must_use]
    pub const fn unread_count(&self) -> u32 {
        self.unread_count
    }

    /// True iff the thread is archived/blocked or its order has terminated.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.status.is_frozen() || self.order_status.is_some_and(OrderStatus::is_terminal)
    }

    /// Records a newer observation of the bound order's status.
    pub fn observe_order_status(&mut self, status: OrderStatus) {
        self.order_status = Some(match self.order_status {
            Some(current) => OrderStatus::freshest(current, status),
            None => status,
        });
    }

    /// Advances the last-activity timestamp; never moves it backwards.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if self.last_message_at.is_none_or(|current| at > current) {
            self.last_message_at = Some(at);
        }
    }

    pub const fn increment_unread(&mut self) {
        self.unread_count = self.unread_count.saturating_add(1);
    }

    pub const fn mark_read_locally(&mut self) {
        self.unread_count = 0;
    }
}
