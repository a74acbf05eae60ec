//! Keyring-based token storage.

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use crate::domain::entities::AuthToken;
use crate::domain::errors::AuthError;
use crate::domain::ports::TokenStoragePort;

const KEYRING_SERVICE: &str = "marketchat";
const DEFAULT_ACCOUNT: &str = "token";

/// System keyring token storage adapter.
///
/// One entry per API host, so switching between staging and production
/// keeps both sessions.
#[derive(Debug, Clone)]
pub struct KeyringTokenStorage {
    service: String,
    account: String,
}

impl KeyringTokenStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::with_names(KEYRING_SERVICE, DEFAULT_ACCOUNT)
    }

    /// Storage keyed by the API host, e.g. `token@api.market.example`.
    #[must_use]
    pub fn for_host(host: &str) -> Self {
        Self::with_names(KEYRING_SERVICE, format!("{DEFAULT_ACCOUNT}@{host}"))
    }

    #[must_use]
    pub fn with_names(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    async fn with_entry<T, F>(&self, op: F) -> Result<T, AuthError>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> Result<T, AuthError> + Send + 'static,
    {
        let service = self.service.clone();
        let account = self.account.clone();

        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &account).map_err(|e| {
                AuthError::retrieval_failed(format!("failed to access keyring: {e}"))
            })?;
            op(entry)
        })
        .await
        .map_err(|e| AuthError::retrieval_failed(format!("keyring task failed: {e}")))?
    }
}

impl Default for KeyringTokenStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStoragePort for KeyringTokenStorage {
    async fn get_token(&self) -> Result<Option<AuthToken>, AuthError> {
        debug!(service = %self.service, account = %self.account, "Retrieving token from keyring");

        self.with_entry(|entry| match entry.get_password() {
            Ok(password) => {
                let token = AuthToken::new(&password);
                if token.is_none() {
                    warn!("Stored token is malformed, ignoring it");
                }
                Ok(token)
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No token stored in keyring");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Failed to retrieve token from keyring");
                Err(AuthError::retrieval_failed(e.to_string()))
            }
        })
        .await
    }

    async fn store_token(&self, token: &AuthToken) -> Result<(), AuthError> {
        debug!(service = %self.service, account = %self.account, "Storing token in keyring");

        let token = token.clone();
        self.with_entry(move |entry| {
            entry.set_password(token.as_str()).map_err(|e| {
                warn!(error = %e, "Failed to store token in keyring");
                AuthError::storage_failed(e.to_string())
            })
        })
        .await
    }

    async fn delete_token(&self) -> Result<(), AuthError> {
        debug!(service = %self.service, account = %self.account, "Deleting token from keyring");

        self.with_entry(|entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Failed to delete token from keyring");
                Err(AuthError::storage_failed(e.to_string()))
            }
        })
        .await
    }
}
