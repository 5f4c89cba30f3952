//! Capture source errors

use std::io;

use thiserror::Error;

/// Errors raised by capture sources
#[derive(Debug, Error)]
pub enum SourceError {
    /// The capture source does not exist
    #[error("capture source not found: {0}")]
    NotFound(String),

    /// The dissector process could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The dissector process ended with an error
    #[error("capture process exited: {0}")]
    Exited(String),

    /// A record could not be decoded
    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// I/O error while reading
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SourceError {
    /// Create a malformed record error
    #[inline]
    pub fn malformed(line: usize, reason: impl ToString) -> Self {
        Self::Malformed {
            line,
            reason: reason.to_string(),
        }
    }

    /// Whether the source can keep going after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Result type for source operations
pub type Result<T> = std::result::Result<T, SourceError>;
