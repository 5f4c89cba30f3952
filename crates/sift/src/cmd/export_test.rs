//! Tests for the export command

use super::*;
use std::fs;

const SNAPSHOT: &str = r#"{
  "packets": [
    {"timestamp": "10:00:01", "src_ip": "10.0.0.1", "dst_ip": "10.0.0.2", "protocol": "TCP",
     "src_port": "5000", "dst_port": "80", "size": 60, "payload": "[PSH,ACK]"},
    {"timestamp": "10:00:02", "src_ip": "N/A", "dst_ip": "N/A", "protocol": "ARP",
     "src_port": "-", "dst_port": "-", "size": 42, "payload": "who-has 10.0.0.1"}
  ]
}"#;

fn args(snapshot: PathBuf, out: PathBuf) -> ExportArgs {
    ExportArgs {
        snapshot,
        format: None,
        out: Some(out),
        prefix: None,
        source: "lab".into(),
    }
}

#[test]
fn test_export_snapshot_file() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("captured_packets.json");
    fs::write(&snapshot, SNAPSHOT).unwrap();

    let out = dir.path().join("exports");
    let report = export(&args(snapshot, out.clone()), &Config::default())
        .unwrap()
        .unwrap();

    assert_eq!(report.records, 2);
    assert_eq!(report.paths.len(), 2);
    for path in &report.paths {
        assert!(path.starts_with(&out));
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("packets_lab_"), "{name}");
    }

    let json = report
        .paths
        .iter()
        .find(|p| p.extension().is_some_and(|e| e == "json"))
        .unwrap();
    let exported = load_records(json).unwrap();
    assert_eq!(exported.len(), 2);
    assert_eq!(exported[1].protocol, "ARP");
}

#[test]
fn test_export_from_directory_with_overrides() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(PACKETS_FILE), SNAPSHOT).unwrap();

    let mut args = args(dir.path().to_path_buf(), dir.path().join("out"));
    args.format = Some(ExportFormat::Csv);
    args.prefix = Some("triage".into());

    let report = export(&args, &Config::default()).unwrap().unwrap();
    assert_eq!(report.paths.len(), 1);

    let path = &report.paths[0];
    assert_eq!(path.extension().unwrap(), "csv");
    assert!(
        path.file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("triage_lab_")
    );

    let csv = fs::read_to_string(path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "timestamp,src_ip,dst_ip,protocol,src_port,dst_port,size,payload"
    );
    assert_eq!(lines.count(), 2);
}

#[test]
fn test_empty_snapshot_exports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("captured_packets.json");
    fs::write(&snapshot, r#"{"packets": []}"#).unwrap();

    let out = dir.path().join("exports");
    let report = export(&args(snapshot, out.clone()), &Config::default()).unwrap();
    assert!(report.is_none());
    assert!(!out.exists());
}

#[test]
fn test_missing_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let err = export(
        &args(dir.path().join("missing.json"), dir.path().join("out")),
        &Config::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("missing.json"));
}
