//! Snapshot, export and tap feed configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Snapshot artifacts written while a session runs
///
/// # Example
///
/// ```toml
/// [snapshot]
/// dir = "/var/lib/sift"
/// flush_every = 10
/// max_records = 100000
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Default: true
    pub enabled: bool,

    /// Directory for `captured_packets.json` and `data_usage.json`
    /// Default: current directory
    pub dir: PathBuf,

    /// Records between flushes (0 = only the final flush)
    /// Default: 10
    pub flush_every: usize,

    /// Records kept in memory per session (0 = unbounded)
    /// Default: 0
    pub max_records: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("."),
            flush_every: 10,
            max_records: 0,
        }
    }
}

/// Export file format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    /// Both files (default)
    #[default]
    Both,
}

/// On-demand export
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExportConfig {
    /// Default: exports
    pub dir: PathBuf,
    /// File name prefix
    /// Default: packets
    pub prefix: String,
    /// Default: both
    pub format: ExportFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("exports"),
            prefix: "packets".into(),
            format: ExportFormat::Both,
        }
    }
}

/// Subscriber feed over a Unix socket
///
/// # Example
///
/// ```toml
/// [tap]
/// enabled = true
/// socket_path = "/run/sift/tap.sock"
/// heartbeat_interval = "15s"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TapConfig {
    /// Default: false
    pub enabled: bool,
    /// Default: /tmp/sift-tap.sock
    pub socket_path: PathBuf,
    /// Records kept for late joiners
    /// Default: 1500
    pub replay_capacity: usize,
    /// Default: 100
    pub max_subscribers: usize,
    /// Items queued per subscriber before its batches are dropped
    /// Default: 256
    pub subscriber_buffer: usize,
    /// Default: 15s
    #[serde(with = "humantime_serde")]
    pub heartbeat_interval: Duration,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            socket_path: PathBuf::from("/tmp/sift-tap.sock"),
            replay_capacity: 1500,
            max_subscribers: 100,
            subscriber_buffer: 256,
            heartbeat_interval: Duration::from_secs(15),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_defaults() {
        let config: SnapshotConfig = toml::from_str("").unwrap();
        assert!(config.enabled);
        assert_eq!(config.dir, PathBuf::from("."));
        assert_eq!(config.flush_every, 10);
        assert_eq!(config.max_records, 0);
    }

    #[test]
    fn test_export_format() {
        let config: ExportConfig = toml::from_str("format = \"csv\"\nprefix = \"lab\"").unwrap();
        assert_eq!(config.format, ExportFormat::Csv);
        assert_eq!(config.prefix, "lab");
        assert_eq!(config.dir, PathBuf::from("exports"));
    }

    #[test]
    fn test_tap_defaults() {
        let config = TapConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.replay_capacity, 1500);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
    }
}
