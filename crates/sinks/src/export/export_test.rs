//! Export tests

use std::fs;

use chrono::{Local, TimeZone};

use sift_protocol::{PacketRecord, SourceId};

use super::{ExportConfig, ExportFormat, Exporter, file_stem};
use crate::snapshot::load_records;

fn records() -> Vec<PacketRecord> {
    vec![
        PacketRecord {
            captured_at: "09:15:00".into(),
            source_addr: "192.168.1.10".into(),
            dest_addr: "8.8.8.8".into(),
            protocol: "DNS".into(),
            source_port: "53124".into(),
            dest_port: "53".into(),
            size_bytes: 74,
            payload_summary: "Query, Name: example.com".into(),
        },
        PacketRecord {
            captured_at: "09:15:01".into(),
            source_addr: "N/A".into(),
            dest_addr: "N/A".into(),
            protocol: "ARP".into(),
            source_port: "-".into(),
            dest_port: "-".into(),
            size_bytes: 42,
            payload_summary: "who-has, Sender: 10.0.0.1".into(),
        },
    ]
}

fn exporter(dir: &std::path::Path) -> Exporter {
    Exporter::new(ExportConfig {
        dir: dir.to_path_buf(),
        prefix: "packets".into(),
        format: ExportFormat::Both,
    })
}

#[test]
fn test_format_parse() {
    assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
    assert_eq!(" json ".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
    assert_eq!("both".parse::<ExportFormat>().unwrap(), ExportFormat::Both);
    assert!("xml".parse::<ExportFormat>().is_err());
    assert_eq!(ExportFormat::default().to_string(), "both");
}

#[test]
fn test_file_stem_sanitizes_source() {
    let at = Local.with_ymd_and_hms(2024, 5, 1, 13, 4, 5).unwrap();
    assert_eq!(
        file_stem("packets", &SourceId::new("\\Device\\NPF_{AB}"), at),
        "packets__Device_NPF__AB__20240501_130405"
    );
    assert_eq!(
        file_stem("cap", &SourceId::new("eth0"), at),
        "cap_eth0_20240501_130405"
    );
}

#[test]
fn test_export_both_formats() {
    let dir = tempfile::tempdir().unwrap();
    let at = Local.with_ymd_and_hms(2024, 5, 1, 13, 4, 5).unwrap();

    let report = exporter(dir.path())
        .export_with(&records(), &SourceId::new("eth0"), ExportFormat::Both, at)
        .unwrap();

    assert_eq!(report.records, 2);
    assert_eq!(
        report.paths,
        vec![
            dir.path().join("packets_eth0_20240501_130405.csv"),
            dir.path().join("packets_eth0_20240501_130405.json"),
        ]
    );
}

#[test]
fn test_same_second_exports_get_distinct_names() {
    let dir = tempfile::tempdir().unwrap();
    let at = Local.with_ymd_and_hms(2024, 5, 1, 13, 4, 5).unwrap();
    let exporter = exporter(dir.path());
    let source = SourceId::new("eth0");

    let first = exporter
        .export_with(&records()[..1], &source, ExportFormat::Both, at)
        .unwrap();
    let second = exporter
        .export_with(&records(), &source, ExportFormat::Both, at)
        .unwrap();
    let third = exporter
        .export_with(&records(), &source, ExportFormat::Json, at)
        .unwrap();

    assert_eq!(
        second.paths,
        vec![
            dir.path().join("packets_eth0_20240501_130405_1.csv"),
            dir.path().join("packets_eth0_20240501_130405_1.json"),
        ]
    );
    assert_eq!(
        third.paths,
        vec![dir.path().join("packets_eth0_20240501_130405_2.json")]
    );

    // the first export is left as written
    assert_eq!(load_records(&first.paths[1]).unwrap().len(), 1);
    assert_eq!(load_records(&second.paths[1]).unwrap().len(), 2);
}

#[test]
fn test_csv_header_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let report = exporter(dir.path())
        .export_with(&records(), &SourceId::new("eth0"), ExportFormat::Csv, Local::now())
        .unwrap();

    let csv = fs::read_to_string(&report.paths[0]).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines[0], "timestamp,src_ip,dst_ip,protocol,src_port,dst_port,size,payload");
    assert_eq!(
        lines[1],
        "09:15:00,192.168.1.10,8.8.8.8,DNS,53124,53,74,\"Query, Name: example.com\""
    );
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_csv_empty_still_has_header() {
    let dir = tempfile::tempdir().unwrap();
    let report = exporter(dir.path())
        .export_with(&[], &SourceId::new("eth0"), ExportFormat::Csv, Local::now())
        .unwrap();

    let csv = fs::read_to_string(&report.paths[0]).unwrap();
    assert_eq!(csv, "timestamp,src_ip,dst_ip,protocol,src_port,dst_port,size,payload\n");
}

#[test]
fn test_json_export_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let original = records();

    let report = exporter(dir.path())
        .export_with(&original, &SourceId::new("eth0"), ExportFormat::Json, Local::now())
        .unwrap();

    assert_eq!(report.paths.len(), 1);
    assert_eq!(load_records(&report.paths[0]).unwrap(), original);
}

#[test]
fn test_export_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let exporter = Exporter::new(ExportConfig {
        dir: nested.clone(),
        ..Default::default()
    });

    let report = exporter.export(&records(), &SourceId::new("eth0")).unwrap();
    assert!(report.paths.iter().all(|p| p.starts_with(&nested) && p.exists()));
}
