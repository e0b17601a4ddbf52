//! Video identifier model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a produced video, used as the base of every artifact name.
///
/// Restricted to a filesystem-safe character set; validated at submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the identifier only uses safe filename characters.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_video_ids() {
        assert!(VideoId::from("abc").is_valid());
        assert!(VideoId::from("clip_2024-01.v2").is_valid());
        assert!(VideoId::from("A1-b2_C3").is_valid());
    }

    #[test]
    fn test_invalid_video_ids() {
        assert!(!VideoId::from("").is_valid());
        assert!(!VideoId::from("has space").is_valid());
        assert!(!VideoId::from("slash/inside").is_valid());
        assert!(!VideoId::from("dot\u{30c9}t").is_valid());
        assert!(!VideoId::from("semi;colon").is_valid());
    }
}
