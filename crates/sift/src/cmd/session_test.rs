//! Tests for configuration to pipeline mapping

use super::*;
use std::str::FromStr;

#[test]
fn test_defaults_map_to_pipeline_defaults() {
    let settings = pipeline_settings(&Config::default());
    assert_eq!(settings, PipelineSettings::default());
}

#[test]
fn test_pipeline_settings_from_config() {
    let config = Config::from_str(
        r#"
[capture]
poll_interval = "20ms"

[channel]
capacity = 0
overflow = "block"

[worker]
stop_timeout = "1s"
drain_on_restart = true

[fanout]
batch_size = 8
busy_threshold = 4

[snapshot]
flush_every = 3
max_records = 500
"#,
    )
    .unwrap();

    let settings = pipeline_settings(&config);
    assert_eq!(settings.channel_capacity, None);
    assert_eq!(settings.overflow, OverflowPolicy::Block);
    assert_eq!(settings.session.worker.poll_interval, Duration::from_millis(20));
    assert_eq!(settings.session.worker.flush_every, 3);
    assert_eq!(settings.session.stop_timeout, Duration::from_secs(1));
    assert!(settings.session.drain_on_restart);
    assert_eq!(settings.fanout.batch_size, 8);
    assert_eq!(settings.fanout.busy_threshold, 4);
    assert_eq!(settings.max_records, 500);
}

#[test]
fn test_args_override_config() {
    let mut config = Config::default();
    let args = SessionArgs {
        filter: Some("dns".into()),
        socket: Some(PathBuf::from("/tmp/other.sock")),
        no_snapshot: true,
        export_dir: Some(PathBuf::from("out")),
        ..SessionArgs::default()
    };

    args.apply(&mut config);

    assert_eq!(config.capture.filter, "dns");
    assert!(config.tap.enabled);
    assert_eq!(config.tap.socket_path, PathBuf::from("/tmp/other.sock"));
    assert!(snapshot_config(&config).is_none());
    assert_eq!(export_config(&config).dir, PathBuf::from("out"));
}

#[test]
fn test_empty_args_leave_config_alone() {
    let mut config = Config::default();
    SessionArgs::default().apply(&mut config);
    assert_eq!(config, Config::default());
}

#[test]
fn test_snapshot_dir() {
    let config = Config::from_str("[snapshot]\ndir = \"/var/lib/sift\"").unwrap();
    let snapshot = snapshot_config(&config).unwrap();
    assert_eq!(snapshot.dir, PathBuf::from("/var/lib/sift"));
}

#[test]
fn test_export_format_mapping() {
    assert_eq!(export_format(ConfigExportFormat::Csv), ExportFormat::Csv);
    assert_eq!(export_format(ConfigExportFormat::Json), ExportFormat::Json);
    assert_eq!(export_format(ConfigExportFormat::Both), ExportFormat::Both);
}

#[test]
fn test_latency_probe_enabled_from_config() {
    let config = Config::from_str("[classify]\nlatency_probe = true\nprobe_port = 4000").unwrap();
    let classifier = classifier(&config);
    assert_eq!(classifier.probe().map(|p| p.port()), Some(4000));

    assert!(super::classifier(&Config::default()).probe().is_none());
}
