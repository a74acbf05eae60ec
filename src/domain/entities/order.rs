//! Order entity and its lifecycle.
//!
//! Orders are owned by the backend; the client only consumes their status to
//! decide whether the bound chat thread still accepts messages.

use serde::{Deserialize, Serialize};

use super::id::string_id;
use super::RequestId;
use crate::domain::errors::MessagingError;

string_id!(
    /// Unique identifier for an order.
    OrderId
);

/// Order status.
///
/// ```text
/// assigned -> in_progress -> pending_completion -> completed
///                 ^                  |
///                 +------ declined --+
/// assigned | in_progress -> canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Provider assigned, work not started.
    Assigned,
    /// Provider started working.
    InProgress,
    /// Provider requested completion, awaiting customer approval.
    PendingCompletion,
    /// Customer approved completion. Terminal.
    Completed,
    /// Order canceled. Terminal.
    #[serde(alias = "cancelled")]
    Canceled,
}

impl OrderStatus {
    /// Returns true for `completed` and `canceled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Returns whether `next` is a legal successor of this status.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Assigned, Self::InProgress | Self::Canceled)
                | (Self::InProgress, Self::PendingCompletion | Self::Canceled)
                | (Self::PendingCompletion, Self::Completed | Self::InProgress)
        )
    }

    /// Validates and returns the next status.
    ///
    /// # Errors
    ///
    /// Returns `MessagingError::InvalidTransition` if the move is not allowed.
    pub fn transition(self, next: Self) -> Result<Self, MessagingError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(MessagingError::invalid_transition(
                "order",
                self.as_str(),
                next.as_str(),
            ))
        }
    }

    /// Picks the fresher of two observations of the same order.
    ///
    /// Terminal states are absorbing, so a terminal observation always wins
    /// over a non-terminal one regardless of which arrived later.
    #[must_use]
    pub const fn freshest(observed: Self, incoming: Self) -> Self {
        if observed.is_terminal() && !incoming.is_terminal() {
            observed
        } else {
            incoming
        }
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::PendingCompletion => "pending_completion",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order as known to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    request_id: Option<RequestId>,
    status: OrderStatus,
}

impl Order {
    /// Creates a new order.
    #[must_use]
    pub const fn new(id: OrderId, request_id: Option<RequestId>, status: OrderStatus) -> Self {
        Self {
            id,
            request_id,
            status,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    #[must_use]
    pub const fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns true once the order has completed or been canceled.
    #[must_use]
    pub const fn freezes_thread(&self) -> bool {
        self.status.is_terminal()
    }
}
