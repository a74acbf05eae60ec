//! Customer approves a provider's application and lands in the new chat.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::services::MessagingSession;
use crate::domain::entities::{ApplicationId, OrderId, RequestId, RequestStatus, ThreadId};
use crate::domain::errors::MessagingError;
use crate::domain::ports::MarketplacePort;

/// Outcome of a successful approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedOrder {
    pub order_id: OrderId,
    pub display_ref: String,
    pub thread_id: ThreadId,
}

/// Accepts an application, then waits for and opens the order's thread.
///
/// Accepting is the only step that may lead to `open_thread_for_order`: the
/// backend creates the order and its thread as a consequence of it.
pub struct ApproveProviderUseCase {
    api: Arc<dyn MarketplacePort>,
    session: MessagingSession,
}

impl ApproveProviderUseCase {
    #[must_use]
    pub const fn new(api: Arc<dyn MarketplacePort>, session: MessagingSession) -> Self {
        Self { api, session }
    }

    /// # Errors
    /// Returns the accept failure, an unexpected request status, or the
    /// thread polling failure.
    pub async fn execute(
        &self,
        request_id: &RequestId,
        application_id: &ApplicationId,
    ) -> Result<ApprovedOrder, MessagingError> {
        info!(request_id = %request_id, application_id = %application_id, "Approving provider");

        let accepted = self
            .api
            .accept_request(request_id, application_id)
            .await
            .inspect_err(|e| warn!(request_id = %request_id, error = %e, "Approval failed"))?;

        if accepted.status != RequestStatus::Accepted {
            return Err(MessagingError::invalid_transition(
                "request",
                accepted.status.as_str(),
                RequestStatus::Accepted.as_str(),
            ));
        }

        let order_id = OrderId::new(accepted.order_id);
        let display_ref = accepted
            .reference
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| request_id.to_string());

        let thread_id = self
            .session
            .open_thread_for_order(&order_id, &display_ref)
            .await?;

        Ok(ApprovedOrder {
            order_id,
            display_ref,
            thread_id,
        })
    }
}
