//! Token storage port definition.

use async_trait::async_trait;

use crate::domain::entities::AuthToken;
use crate::domain::errors::AuthError;

/// Persistent home of the marketplace bearer token.
#[async_trait]
pub trait TokenStoragePort: Send + Sync {
    async fn get_token(&self) -> Result<Option<AuthToken>, AuthError>;

    async fn store_token(&self, token: &AuthToken) -> Result<(), AuthError>;

    /// Removes the stored token. Succeeds when nothing is stored.
    async fn delete_token(&self) -> Result<(), AuthError>;

    async fn has_token(&self) -> Result<bool, AuthError> {
        Ok(self.get_token().await?.is_some())
    }
}
