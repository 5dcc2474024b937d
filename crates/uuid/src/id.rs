//! Implementation of [`ResourceId`].

use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Length of the canonical hyphenated form.
const CANONICAL_LEN: usize = 36;

/// Byte offsets of the hyphens in the canonical form.
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Identifier for a synthesised resource or a persisted bundle.
///
/// Once constructed the wrapped value is guaranteed to be a valid UUID that renders in
/// canonical form.
///
/// # Construction
/// - [`ResourceId::new`] generates a fresh v4 identifier.
/// - [`ResourceId::parse`] validates an externally supplied identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(Uuid);

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceId {
    /// Generates a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not canonical.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "identifier must be a lowercase hyphenated UUID, got: '{input}'"
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("invalid UUID '{input}': {e}")))
    }

    /// Returns true if `input` is in canonical form.
    ///
    /// Purely syntactic: 36 bytes, hyphens at 8/13/18/23, lowercase hex elsewhere.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == CANONICAL_LEN
            && input.bytes().enumerate().all(|(i, b)| {
                if HYPHEN_POSITIONS.contains(&i) {
                    b == b'-'
                } else {
                    matches!(b, b'0'..=b'9' | b'a'..=b'f')
                }
            })
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ResourceId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ResourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ResourceId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_canonical_id() {
        let id = ResourceId::new();
        let rendered = id.to_string();

        assert_eq!(rendered.len(), 36);
        assert!(ResourceId::is_canonical(&rendered));
    }

    #[test]
    fn new_ids_are_distinct() {
        assert_ne!(ResourceId::new(), ResourceId::new());
    }

    #[test]
    fn parse_accepts_canonical() {
        let canonical = "550e8400-e29b-41d4-a716-446655440000";
        let id = ResourceId::parse(canonical).expect("canonical id");
        assert_eq!(id.to_string(), canonical);
    }

    #[test]
    fn parse_rejects_simple_form() {
        let result = ResourceId::parse("550e8400e29b41d4a716446655440000");
        match result {
            Err(UuidError::InvalidInput(msg)) => assert!(msg.contains("hyphenated")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_uppercase_and_traversal() {
        assert!(ResourceId::parse("550E8400-E29B-41D4-A716-446655440000").is_err());
        assert!(ResourceId::parse("../../etc/passwd").is_err());
        assert!(ResourceId::parse("").is_err());
    }

    #[test]
    fn is_canonical_checks_hyphen_positions() {
        assert!(!ResourceId::is_canonical(
            "550e8400e-29b-41d4-a716-446655440000"
        ));
        assert!(ResourceId::is_canonical(
            "00000000-0000-0000-0000-000000000000"
        ));
    }

    #[test]
    fn serde_uses_canonical_string() {
        let id = ResourceId::parse("550e8400-e29b-41d4-a716-446655440000").expect("valid");
        let json = serde_json::to_string(&id).expect("serialise");
        assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");

        let back: ResourceId = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, id);
    }
}
