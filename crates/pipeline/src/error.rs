//! Pipeline error types
//!
//! Errors surfaced to whoever drives the control plane. Per-packet and
//! per-consumer failures never show up here; they are logged and counted.

use thiserror::Error;

use sift_classify::FilterError;
use sift_sinks::SinkError;
use sift_sources::SourceError;

/// Control plane errors
#[derive(Debug, Error)]
pub enum ControlError {
    /// `start` while a session is active
    #[error("a capture session is already running")]
    AlreadyRunning,

    /// Operation needs an active session
    #[error("no capture session is running")]
    NotRunning,

    /// Blank source identifier
    #[error("capture source must not be empty")]
    EmptySource,

    /// Nothing has been captured from any source yet
    #[error("no capture source has been used yet")]
    NoSource,

    /// Filter rejected by the worker-side filter parser
    #[error("invalid display filter: {0}")]
    InvalidFilter(#[from] FilterError),

    /// The capture source could not be opened
    #[error("capture source failed: {0}")]
    Source(#[from] SourceError),

    /// Export or snapshot I/O failed
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Worker or fan-out thread could not be spawned
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, ControlError>;
