//! Token resolution use case.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::dto::TokenSource;
use crate::domain::entities::AuthToken;
use crate::domain::errors::AuthError;
use crate::domain::ports::TokenStoragePort;

/// Resolved token with its source.
#[derive(Debug, Clone)]
pub struct ResolvedToken {
    pub token: AuthToken,
    pub source: TokenSource,
}

impl ResolvedToken {
    #[must_use]
    pub const fn new(token: AuthToken, source: TokenSource) -> Self {
        Self { token, source }
    }
}

/// Finds the session token.
///
/// An explicit token (flag or environment) wins over the keyring so a
/// stored session can be overridden for one run.
pub struct ResolveTokenUseCase {
    storage_port: Arc<dyn TokenStoragePort>,
}

impl ResolveTokenUseCase {
    #[must_use]
    pub const fn new(storage_port: Arc<dyn TokenStoragePort>) -> Self {
        Self { storage_port }
    }

    /// # Errors
    /// Returns [`AuthError::InvalidTokenFormat`] when an explicit token is
    /// malformed. Keyring failures are logged and treated as "no token".
    pub async fn execute(
        &self,
        explicit_token: Option<String>,
    ) -> Result<Option<ResolvedToken>, AuthError> {
        if let Some(raw) = explicit_token.filter(|s| !s.trim().is_empty()) {
            let token = AuthToken::new(&raw)
                .ok_or_else(|| AuthError::invalid_format("token is too short or contains spaces"))?;
            info!(token = %token, "Using token from command line / environment");
            return Ok(Some(ResolvedToken::new(token, TokenSource::CommandLine)));
        }

        debug!("Checking keyring for stored token");
        match self.storage_port.get_token().await {
            Ok(Some(token)) => {
                info!(token = %token, "Using token from system keyring");
                Ok(Some(ResolvedToken::new(token, TokenSource::Keyring)))
            }
            Ok(None) => {
                debug!("No token found in any source");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Failed to read keyring");
                Ok(None)
            }
        }
    }
}
