//! Error types for the tap crate

use std::io;
use thiserror::Error;

/// Errors that can occur in the tap feed
#[derive(Error, Debug)]
pub enum TapError {
    /// I/O error (socket operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A line that is not valid feed JSON
    #[error("malformed feed message: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol error (unexpected message)
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Maximum subscribers reached
    #[error("maximum subscribers reached ({max})")]
    MaxSubscribers { max: usize },

    /// Subscriber not found
    #[error("subscriber not found: {id}")]
    SubscriberNotFound { id: u64 },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for tap operations
pub type Result<T> = std::result::Result<T, TapError>;
