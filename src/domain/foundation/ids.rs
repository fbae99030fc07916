//! Identifier value objects.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;

/// Local user identifier.
///
/// The auth provider issues UUID strings, but the reconciler treats the id
/// as opaque; only non-emptiness is enforced here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new UserId, returning error if empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::empty_field("user_id"));
        }
        Ok(Self(id))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_non_empty() {
        let id = UserId::new("user-123").unwrap();
        assert_eq!(id.as_str(), "user-123");
    }

    #[test]
    fn user_id_rejects_empty() {
        assert!(UserId::new("").is_err());
    }

    #[test]
    fn user_id_displays_inner_value() {
        let id = UserId::new("u1").unwrap();
        assert_eq!(id.to_string(), "u1");
    }
}
