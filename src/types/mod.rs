pub mod error;
pub mod section;

pub use error::{ErrorCategory, ErrorClassifier, LlmError, Result, ResultExt, ScribeError};
pub use section::{CompletedSection, CompletionKind, Section, Source};

// =============================================================================
// Domain Newtypes
// =============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type-safe wrapper for session IDs
///
/// Prevents accidental mixing of session IDs with other string types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse a caller-supplied id, rejecting shapes that cannot name a file
    pub fn parse(id: &str) -> Result<Self> {
        let id = Self(id.to_string());
        id.validate()?;
        Ok(id)
    }

    /// Session ids become file names under the output directory, so they
    /// must be non-empty and free of path separators and `..`.
    pub fn validate(&self) -> Result<()> {
        let id = self.0.as_str();
        if id.trim().is_empty() {
            return Err(ScribeError::protocol("session id cannot be empty"));
        }
        if id.contains(['/', '\\']) || id.contains("..") {
            return Err(ScribeError::protocol(format!(
                "session id '{}' must not contain path separators or '..'",
                id
            )));
        }
        Ok(())
    }

    /// Generate a fresh random session identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_roundtrip() {
        let id = SessionId::new("abc");
        assert_eq!(id.as_str(), "abc");
        assert_eq!(id.to_string(), "abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_generated_ids_are_valid() {
        assert!(SessionId::generate().validate().is_ok());
    }

    #[test]
    fn test_parse_accepts_plain_ids() {
        assert_eq!(SessionId::parse("rust-2024_draft.v2").unwrap().as_str(), "rust-2024_draft.v2");
    }

    #[test]
    fn test_parse_rejects_path_shapes() {
        for bad in ["", "   ", "/tmp/evil", "../../etc/x", "a/b", "a\\b", "..", "x..y"] {
            assert!(
                matches!(SessionId::parse(bad), Err(ScribeError::ProtocolViolation(_))),
                "accepted {:?}",
                bad
            );
        }
    }
}
