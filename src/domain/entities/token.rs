//! Bearer token value object.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Session bearer token with validation and masking.
///
/// The backing memory is wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AuthToken {
    value: String,
}

impl AuthToken {
    const MIN_TOKEN_LENGTH: usize = 16;

    /// Creates new token with format validation.
    ///
    /// Accepts an optional `Bearer ` prefix, which is stripped.
    #[must_use]
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        let value = value.as_ref().trim();
        let value = value.strip_prefix("Bearer ").unwrap_or(value).trim();

        if value.len() < Self::MIN_TOKEN_LENGTH {
            return None;
        }

        if value.chars().any(char::is_whitespace) {
            return None;
        }

        Some(Self {
            value: value.to_string(),
        })
    }

    /// Creates token without validation.
    #[must_use]
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Returns token as string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.value)
    }

    /// Returns masked token for display.
    #[must_use]
    pub fn masked(&self) -> String {
        if self.value.len() <= 10 {
            return "*".repeat(self.value.len());
        }

        let visible_prefix = self.value.get(..4).unwrap_or_default();
        let visible_suffix = self.value.get(self.value.len() - 4..).unwrap_or_default();
        format!("{visible_prefix}...{visible_suffix}")
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("value", &self.masked())
            .finish()
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}

/// The most recently known token, shared between the REST client, the socket
/// channels and the session.
///
/// Reads always see the latest value, so a token refreshed mid-session is
/// picked up by the next request.
#[derive(Clone, Default)]
pub struct SharedCredentials {
    inner: Arc<RwLock<Option<AuthToken>>>,
}

impl SharedCredentials {
    #[must_use]
    pub fn new(token: Option<AuthToken>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(token)),
        }
    }

    pub fn set(&self, token: AuthToken) {
        *self.inner.write() = Some(token);
    }

    pub fn clear(&self) {
        self.inner.write().take();
    }

    #[must_use]
    pub fn current(&self) -> Option<AuthToken> {
        self.inner.read().clone()
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.inner.read().is_some()
    }
}

impl fmt::Debug for SharedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCredentials")
            .field("present", &self.is_present())
            .finish()
    }
}
