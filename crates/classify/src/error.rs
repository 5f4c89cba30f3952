//! Classification errors

use sift_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised while classifying a packet
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// No usable wire length; there is no sentinel for `size`
    #[error("packet has no wire length")]
    MissingLength,

    /// A field could not be interpreted
    #[error("{0}")]
    Field(#[from] ProtocolError),
}

/// Result type for classification
pub type Result<T> = std::result::Result<T, ClassifyError>;
