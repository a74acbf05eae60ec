//! Customer service request lifecycle.

use serde::{Deserialize, Serialize};

use super::id::string_id;
use crate::domain::errors::MessagingError;

string_id!(
    /// Unique identifier for a customer request.
    RequestId
);

string_id!(
    /// Unique identifier for a provider's application to a request.
    ApplicationId
);

/// Request status.
///
/// `open`/`pending` move to `accepted` when the customer approves exactly one
/// applicant, which is what makes the backend create the order and the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Published, accepting applications.
    Open,
    /// Has applications awaiting a decision.
    Pending,
    /// A provider was approved.
    Accepted,
    /// Work finished.
    Completed,
    /// Withdrawn or expired without a provider.
    Closed,
}

impl RequestStatus {
    /// Returns whether `next` is a legal successor of this status.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Pending | Self::Accepted | Self::Closed)
                | (Self::Pending, Self::Accepted | Self::Closed)
                | (Self::Accepted, Self::Completed)
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
                "request",
                self.as_str(),
                next.as_str(),
            ))
        }
    }

    /// Returns true while providers may still apply.
    #[must_use]
    pub const fn accepts_applications(self) -> bool {
        matches!(self, Self::Open | Self::Pending)
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Completed => "completed",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
