//! Fan-out consumer contract
//!
//! Consumers receive batches of records in producer order, plus payload-less
//! session events. A consumer error affects only that consumer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::PacketRecord;

/// A batch of records handed to consumers by value
pub type RecordBatch = Arc<[PacketRecord]>;

/// Session lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    CaptureStarted,
    CaptureStopped,
    DataCleared,
}

impl SessionEvent {
    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaptureStarted => "capture_started",
            Self::CaptureStopped => "capture_stopped",
            Self::DataCleared => "data_cleared",
        }
    }
}

/// Errors a consumer may report back to the fan-out
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Consumer cannot accept data right now
    #[error("consumer unavailable: {0}")]
    Unavailable(String),

    /// I/O failure while writing the batch
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

/// A registered fan-out consumer
pub trait Consumer: Send + Sync {
    /// Name used in logs and metrics
    fn name(&self) -> &str;

    /// Accept one batch of records
    fn deliver(&self, batch: &RecordBatch) -> Result<(), ConsumerError>;

    /// Observe a session event
    fn notify(&self, event: SessionEvent) -> Result<(), ConsumerError> {
        let _ = event;
        Ok(())
    }
}
