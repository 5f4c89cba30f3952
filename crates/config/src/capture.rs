//! Capture and classification configuration

use std::time::Duration;

use serde::Deserialize;

/// Default packet dissector binary
pub const DEFAULT_PROGRAM: &str = "tshark";

/// Default latency probe port
pub const DEFAULT_PROBE_PORT: u16 = 12345;

/// Capture source configuration
///
/// # Example
///
/// ```toml
/// [capture]
/// interface = "eth0"
/// filter = "tcp or dns"
/// program = "/usr/bin/tshark"
/// extra_args = ["-B", "4"]
/// poll_interval = "100ms"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Interface to capture on when none is given on the command line
    pub interface: Option<String>,

    /// Display filter applied at session start (blank = everything)
    pub filter: String,

    /// Dissector binary for live capture
    /// Default: tshark
    pub program: String,

    /// Extra arguments passed to the dissector
    pub extra_args: Vec<String>,

    /// Ask the dissector for raw frame bytes (needed by the latency probe
    /// and the raw-frame payload fallback)
    /// Default: true
    pub include_raw: bool,

    /// Packets buffered between the dissector reader and the worker
    /// Default: 1000
    pub reader_capacity: usize,

    /// Longest a single source poll may block; bounds stop latency
    /// Default: 100ms
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Replay files at their captured pace
    /// Default: false
    pub realtime_replay: bool,

    /// Longest pause between replayed packets in realtime mode
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub max_replay_gap: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: None,
            filter: String::new(),
            program: DEFAULT_PROGRAM.into(),
            extra_args: Vec::new(),
            include_raw: true,
            reader_capacity: 1000,
            poll_interval: Duration::from_millis(100),
            realtime_replay: false,
            max_replay_gap: Duration::from_secs(1),
        }
    }
}

/// Classifier configuration
///
/// # Example
///
/// ```toml
/// [classify]
/// latency_probe = true
/// probe_port = 12345
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Decode the latency probe header on UDP to `probe_port`
    /// Default: false
    pub latency_probe: bool,

    /// Destination port of probe traffic
    /// Default: 12345
    pub probe_port: u16,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            latency_probe: false,
            probe_port: DEFAULT_PROBE_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_defaults() {
        let config: CaptureConfig = toml::from_str("").unwrap();
        assert_eq!(config, CaptureConfig::default());
        assert_eq!(config.program, "tshark");
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert!(config.include_raw);
    }

    #[test]
    fn test_capture_full() {
        let toml = r#"
interface = "wlan0"
filter = "dns"
extra_args = ["-B", "4"]
poll_interval = "250ms"
realtime_replay = true
max_replay_gap = "2s"
"#;
        let config: CaptureConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.interface.as_deref(), Some("wlan0"));
        assert_eq!(config.filter, "dns");
        assert_eq!(config.extra_args, vec!["-B", "4"]);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert!(config.realtime_replay);
        assert_eq!(config.max_replay_gap, Duration::from_secs(2));
    }

    #[test]
    fn test_classify_defaults() {
        let config: ClassifyConfig = toml::from_str("").unwrap();
        assert!(!config.latency_probe);
        assert_eq!(config.probe_port, 12345);
    }
}
