//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Why a configuration could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// TOML syntax, an unknown key or a value of the wrong type
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("[{section}] is missing required field '{field}'")]
    MissingField {
        section: &'static str,
        field: &'static str,
    },

    /// A field is present but out of range
    #[error("[{section}] has invalid {field}: {message}")]
    InvalidValue {
        section: &'static str,
        field: &'static str,
        message: String,
    },

    /// Log level given with `--log-level` or `[log] level`
    #[error("unknown log level '{0}' (expected trace, debug, info, warn or error)")]
    UnknownLogLevel(String),
}

impl ConfigError {
    pub fn missing_field(section: &'static str, field: &'static str) -> Self {
        Self::MissingField { section, field }
    }

    pub fn invalid_value(
        section: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section,
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::missing_field("export", "dir");
        assert_eq!(err.to_string(), "[export] is missing required field 'dir'");
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("fanout", "batch_size", "must be at least 1");
        assert!(err.to_string().contains("[fanout]"));
        assert!(err.to_string().contains("batch_size"));
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn test_unknown_log_level() {
        let err = ConfigError::UnknownLogLevel("loud".into());
        assert!(err.to_string().contains("'loud'"));
    }
}
