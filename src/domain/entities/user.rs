//! Marketplace user identity.

use super::id::string_id;

string_id!(
    /// Unique identifier for a marketplace user (customer or provider).
    UserId
);

/// Sentinel sender id used by server-generated and local system messages.
pub const SYSTEM_SENDER: &str = "system";

impl UserId {
    /// Returns the `system` sentinel id.
    #[must_use]
    pub fn system() -> Self {
        Self::new(SYSTEM_SENDER)
    }

    /// Returns true for the `system` sentinel.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.as_str() == SYSTEM_SENDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_compare_after_trimming() {
        assert_eq!(UserId::new(" 42 "), UserId::new("42"));
        assert_eq!(UserId::from(String::from("u1")), UserId::from("u1"));
    }

    #[test]
    fn test_system_sentinel() {
        assert!(UserId::system().is_system());
        assert!(!UserId::new("systems").is_system());
    }

    #[test]
    fn test_serializes_transparently() {
        let json = serde_json::to_string(&UserId::new("u7")).unwrap();
        assert_eq!(json, r#""u7""#);
    }
}
