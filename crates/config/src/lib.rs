//! Sift Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid configuration; only specify what you change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use sift_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[capture]\ninterface = \"eth0\"").unwrap();
//! assert_eq!(config.capture.interface.as_deref(), Some("eth0"));
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "debug"
//! output = "/var/log/sift.log"
//!
//! [capture]
//! interface = "eth0"
//! filter = "tcp or dns"
//!
//! [snapshot]
//! dir = "/var/lib/sift"
//!
//! [tap]
//! enabled = true
//! ```

mod capture;
mod error;
mod logging;
mod output;
mod pipeline;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use capture::{CaptureConfig, ClassifyConfig, DEFAULT_PROBE_PORT, DEFAULT_PROGRAM};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use output::{ExportConfig, ExportFormat, SnapshotConfig, TapConfig};
pub use pipeline::{ChannelConfig, FanoutConfig, Overflow, WorkerConfig};

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Diagnostic logging
    pub log: LogConfig,

    /// Live capture and replay
    pub capture: CaptureConfig,

    /// Classifier options
    pub classify: ClassifyConfig,

    /// Distribution channel between worker and fan-out
    pub channel: ChannelConfig,

    /// Session worker lifecycle
    pub worker: WorkerConfig,

    /// Fan-out batching and pacing
    pub fanout: FanoutConfig,

    /// Snapshot artifacts
    pub snapshot: SnapshotConfig,

    /// On-demand export
    pub export: ExportConfig,

    /// Subscriber feed
    pub tap: TapConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
