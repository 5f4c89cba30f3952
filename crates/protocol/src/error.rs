//! Protocol error types
//!
//! Errors that can occur when reading values out of decoded packets.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Field value is not valid hex (with or without `:` separators)
    #[error("invalid hex in field {field}: {reason}")]
    InvalidHex { field: String, reason: String },

    /// Field value is not a valid integer
    #[error("invalid integer in field {field}: {value}")]
    InvalidInteger { field: String, value: String },

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

impl ProtocolError {
    /// Create an invalid hex error
    #[inline]
    pub fn invalid_hex(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidHex {
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid integer error
    #[inline]
    pub fn invalid_integer(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidInteger {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a missing field error
    #[inline]
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField(field)
    }
}
