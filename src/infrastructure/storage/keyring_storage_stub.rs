//! Stub keyring storage for builds without keyring support.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::entities::AuthToken;
use crate::domain::errors::AuthError;
use crate::domain::ports::TokenStoragePort;

/// Token storage that never holds a token; `--token` is the only source.
#[derive(Debug, Clone, Default)]
pub struct KeyringTokenStorage;

impl KeyringTokenStorage {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn for_host(_host: &str) -> Self {
        Self
    }
}

#[async_trait]
impl TokenStoragePort for KeyringTokenStorage {
    async fn get_token(&self) -> Result<Option<AuthToken>, AuthError> {
        debug!("Keyring feature disabled, no stored token");
        Ok(None)
    }

    async fn store_token(&self, _token: &AuthToken) -> Result<(), AuthError> {
        Err(AuthError::storage_failed(
            "built without keyring support",
        ))
    }

    async fn delete_token(&self) -> Result<(), AuthError> {
        debug!("Keyring feature disabled, nothing to delete");
        Ok(())
    }
}
