//! Credential DTOs.

/// Where the session token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// `--token` flag or `MARKETCHAT_TOKEN`.
    CommandLine,
    Keyring,
}

impl TokenSource {
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::CommandLine => "command line / environment",
            Self::Keyring => "system keyring",
        }
    }
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Token handed to `login`.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub token: String,
    pub source: TokenSource,
    /// Whether to write the token to the keyring once verified.
    pub persist_token: bool,
}

impl LoginRequest {
    #[must_use]
    pub const fn new(token: String, source: TokenSource) -> Self {
        Self {
            token,
            source,
            persist_token: true,
        }
    }

    #[must_use]
    pub const fn without_persistence(mut self) -> Self {
        self.persist_token = false;
        self
    }
}

/// Outcome of a verified login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub token_source: TokenSource,
    pub token_persisted: bool,
    /// Threads visible to the token at verification time.
    pub thread_count: usize,
}
