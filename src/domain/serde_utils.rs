//! Serde utilities for backend identifiers.
//!
//! The marketplace backend is not consistent about id representation: the same
//! user id can arrive as `"42"` over REST and as `42` over the socket. Every id
//! is normalized to its string form at the deserialization boundary so that
//! comparisons downstream are plain string equality.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Deserializes an id that may be a string or a number into a `String`.
pub mod string_or_number {
    use super::{Deserializer, Visitor, de, fmt};

    struct IdVisitor;

    impl Visitor<'_> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer id")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(de::Error::custom("id must not be empty"));
            }
            Ok(trimmed.to_string())
        }
    }

    /// Deserializes a string-or-number id.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is neither a string nor an integer, or is empty.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(IdVisitor)
    }

    /// Optional variant, `null` and missing map to `None`.
    pub mod option {
        use super::super::{Deserialize, Deserializer};

        #[derive(Deserialize)]
        struct Wrapped(#[serde(deserialize_with = "super::deserialize")] String);

        /// Deserializes an optional string-or-number id.
        ///
        /// # Errors
        ///
        /// Returns an error if a present value is not a valid id.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<Wrapped>::deserialize(deserializer).map(|opt| opt.map(|Wrapped(id)| id))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(with = "super::string_or_number")]
        id: String,
        #[serde(default, with = "super::string_or_number::option")]
        other: Option<String>,
    }

    #[test]
    fn test_numeric_and_string_ids_normalize_equal() {
        let a: Holder = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        let b: Holder = serde_json::from_str(r#"{"id": "42"}"#).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_string_id_is_trimmed() {
        let h: Holder = serde_json::from_str(r#"{"id": " u1 "}"#).unwrap();
        assert_eq!(h.id, "u1");
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(serde_json::from_str::<Holder>(r#"{"id": ""}"#).is_err());
    }

    #[test]
    fn test_optional_id() {
        let h: Holder = serde_json::from_str(r#"{"id": 1, "other": 7}"#).unwrap();
        assert_eq!(h.other.as_deref(), Some("7"));

        let h: Holder = serde_json::from_str(r#"{"id": 1, "other": null}"#).unwrap();
        assert!(h.other.is_none());

        let h: Holder = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert!(h.other.is_none());
    }
}
