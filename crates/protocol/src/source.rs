//! Capture source identification
//!
//! `SourceId` names what a session captures from: an interface name for
//! live capture, or a file path for replay.

use std::fmt;

/// Capture source identifier
///
/// # Example
///
/// ```
/// use sift_protocol::SourceId;
///
/// let source = SourceId::new("eth0");
/// assert_eq!(source.as_str(), "eth0");
/// assert!(!source.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(String);

impl SourceId {
    /// Create a new source ID
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the source ID as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is blank
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// File-name-safe rendering: `\ / : * ? " < > | { }` become `_`
    pub fn sanitized(&self) -> String {
        self.0
            .chars()
            .map(|c| match c {
                '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '{' | '}' => '_',
                other => other,
            })
            .collect()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
