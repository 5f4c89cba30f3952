//! Configuration validation
//!
//! Catches values that deserialize fine but cannot drive a session:
//! - zero-sized batches, buffers and intervals
//! - blank export destinations
//! - a probe port of 0
//! - a tap socket without a path

use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_capture(config)?;
    validate_pipeline(config)?;
    validate_output(config)?;
    validate_tap(config)?;
    Ok(())
}

fn validate_capture(config: &Config) -> Result<()> {
    let capture = &config.capture;

    if capture.program.trim().is_empty() {
        return Err(ConfigError::missing_field("capture", "program"));
    }
    if let Some(ref interface) = capture.interface
        && interface.trim().is_empty()
    {
        return Err(ConfigError::invalid_value(
            "capture",
            "interface",
            "must not be blank when set",
        ));
    }
    if capture.reader_capacity == 0 {
        return Err(ConfigError::invalid_value(
            "capture",
            "reader_capacity",
            "must be at least 1",
        ));
    }
    non_zero("capture", "poll_interval", capture.poll_interval)?;

    if config.classify.latency_probe && config.classify.probe_port == 0 {
        return Err(ConfigError::invalid_value(
            "classify",
            "probe_port",
            "must not be 0",
        ));
    }

    Ok(())
}

fn validate_pipeline(config: &Config) -> Result<()> {
    let fanout = &config.fanout;

    if fanout.batch_size == 0 {
        return Err(ConfigError::invalid_value(
            "fanout",
            "batch_size",
            "must be at least 1",
        ));
    }
    if fanout.busy_threshold == 0 || fanout.busy_threshold > fanout.batch_size {
        return Err(ConfigError::invalid_value(
            "fanout",
            "busy_threshold",
            format!("must be between 1 and batch_size ({})", fanout.batch_size),
        ));
    }
    non_zero("fanout", "idle_delay", fanout.idle_delay)?;
    non_zero("worker", "stop_timeout", config.worker.stop_timeout)?;

    Ok(())
}

fn validate_output(config: &Config) -> Result<()> {
    if config.snapshot.enabled && config.snapshot.dir.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("snapshot", "dir"));
    }
    if config.export.dir.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("export", "dir"));
    }
    let prefix = config.export.prefix.trim();
    if prefix.is_empty() {
        return Err(ConfigError::missing_field("export", "prefix"));
    }
    if prefix.contains(['/', '\\']) {
        return Err(ConfigError::invalid_value(
            "export",
            "prefix",
            "must be a file name, not a path",
        ));
    }
    Ok(())
}

fn validate_tap(config: &Config) -> Result<()> {
    let tap = &config.tap;
    if !tap.enabled {
        return Ok(());
    }

    if tap.socket_path.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("tap", "socket_path"));
    }
    if tap.max_subscribers == 0 {
        return Err(ConfigError::invalid_value(
            "tap",
            "max_subscribers",
            "must be at least 1",
        ));
    }
    if tap.subscriber_buffer == 0 {
        return Err(ConfigError::invalid_value(
            "tap",
            "subscriber_buffer",
            "must be at least 1",
        ));
    }
    non_zero("tap", "heartbeat_interval", tap.heartbeat_interval)?;

    Ok(())
}

fn non_zero(section: &'static str, field: &'static str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(ConfigError::invalid_value(section, field, "must be greater than 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn rejects(toml: &str, needle: &str) {
        let err = Config::from_str(toml).unwrap_err();
        assert!(
            err.to_string().contains(needle),
            "expected '{needle}' in '{err}'"
        );
    }

    // ========================================================================
    // Capture
    // ========================================================================

    #[test]
    fn test_blank_program() {
        rejects("[capture]\nprogram = \" \"", "program");
    }

    #[test]
    fn test_blank_interface() {
        rejects("[capture]\ninterface = \"\"", "interface");
    }

    #[test]
    fn test_zero_poll_interval() {
        rejects("[capture]\npoll_interval = \"0s\"", "poll_interval");
    }

    #[test]
    fn test_probe_port_only_checked_when_enabled() {
        assert!(Config::from_str("[classify]\nprobe_port = 0").is_ok());
        rejects("[classify]\nlatency_probe = true\nprobe_port = 0", "probe_port");
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    #[test]
    fn test_zero_batch_size() {
        rejects("[fanout]\nbatch_size = 0", "batch_size");
    }

    #[test]
    fn test_busy_threshold_above_batch_size() {
        rejects("[fanout]\nbatch_size = 5\nbusy_threshold = 6", "busy_threshold");
        assert!(Config::from_str("[fanout]\nbatch_size = 5\nbusy_threshold = 5").is_ok());
    }

    #[test]
    fn test_zero_stop_timeout() {
        rejects("[worker]\nstop_timeout = \"0ms\"", "stop_timeout");
    }

    // ========================================================================
    // Output
    // ========================================================================

    #[test]
    fn test_blank_export_prefix() {
        rejects("[export]\nprefix = \"\"", "prefix");
    }

    #[test]
    fn test_export_prefix_with_separator() {
        rejects("[export]\nprefix = \"a/b\"", "file name");
    }

    #[test]
    fn test_blank_snapshot_dir_ignored_when_disabled() {
        rejects("[snapshot]\ndir = \"\"", "[snapshot]");
        assert!(Config::from_str("[snapshot]\nenabled = false\ndir = \"\"").is_ok());
    }

    // ========================================================================
    // Tap
    // ========================================================================

    #[test]
    fn test_tap_limits_checked_when_enabled() {
        assert!(Config::from_str("[tap]\nmax_subscribers = 0").is_ok());
        rejects("[tap]\nenabled = true\nmax_subscribers = 0", "max_subscribers");
        rejects("[tap]\nenabled = true\nsubscriber_buffer = 0", "subscriber_buffer");
        rejects("[tap]\nenabled = true\nsocket_path = \"\"", "socket_path");
    }
}
