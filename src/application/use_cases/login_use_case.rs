//! Login use case implementation.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::application::dto::{LoginRequest, LoginResponse};
use crate::domain::entities::{AuthToken, SharedCredentials};
use crate::domain::errors::AuthError;
use crate::domain::ports::{MarketplacePort, TokenStoragePort};

/// Verifies a token against the API and optionally stores it.
#[derive(Clone)]
pub struct LoginUseCase {
    api: Arc<dyn MarketplacePort>,
    storage_port: Arc<dyn TokenStoragePort>,
    credentials: SharedCredentials,
}

impl LoginUseCase {
    #[must_use]
    pub const fn new(
        api: Arc<dyn MarketplacePort>,
        storage_port: Arc<dyn TokenStoragePort>,
        credentials: SharedCredentials,
    ) -> Self {
        Self {
            api,
            storage_port,
            credentials,
        }
    }

    /// Installs the token and checks it by listing the viewer's threads.
    ///
    /// On rejection the previous credentials are restored.
    ///
    /// # Errors
    /// Returns an error if the token is malformed or refused by the server.
    pub async fn execute(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        debug!(source = %request.source, "Attempting login");

        let token = AuthToken::new(&request.token).ok_or_else(|| {
            warn!("Invalid token format provided");
            AuthError::invalid_format("token is too short or contains spaces")
        })?;

        let previous = self.credentials.current();
        self.credentials.set(token.clone());

        let page = match self.api.fetch_threads().await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "Token verification failed");
                match previous {
                    Some(previous) => self.credentials.set(previous),
                    None => self.credentials.clear(),
                }
                return Err(if e.is_unauthorized() {
                    AuthError::rejected("the server did not accept this token")
                } else {
                    AuthError::rejected(e.user_message())
                });
            }
        };
        info!(token = %token, threads = page.data.len(), "Token verified");

        let token_persisted = if request.persist_token {
            match self.storage_port.store_token(&token).await {
                Ok(()) => {
                    info!("Token persisted to secure storage");
                    true
                }
                Err(e) => {
                    error!(error = %e, "Failed to persist token to secure storage");
                    false
                }
            }
        } else {
            debug!("Token persistence disabled, skipping storage");
            false
        };

        Ok(LoginResponse {
            token_source: request.source,
            token_persisted,
            thread_count: page.data.len(),
        })
    }

    /// Forgets the token in memory and in the keyring.
    ///
    /// # Errors
    /// Returns error if the keyring entry cannot be removed.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.credentials.clear();
        self.storage_port.delete_token().await.inspect_err(|e| {
            error!(error = %e, "Failed to delete token from secure storage");
        })?;
        info!("Token deleted from secure storage");
        Ok(())
    }
}
