//! Tests for PacketRecord serialization

use crate::record::{NO_ADDRESS, NO_PORT, PacketRecord};

fn record() -> PacketRecord {
    PacketRecord {
        captured_at: "12:30:45".into(),
        source_addr: "10.0.0.1".into(),
        dest_addr: "10.0.0.2".into(),
        protocol: "TCP".into(),
        source_port: "443".into(),
        dest_port: "51234".into(),
        size_bytes: 66,
        payload_summary: "[ACK], seq=1, ack=1, win=501".into(),
    }
}

#[test]
fn test_record_serializes_with_column_names() {
    let json = serde_json::to_value(record()).unwrap();
    let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
    for key in [
        "timestamp", "src_ip", "dst_ip", "protocol", "src_port", "dst_port", "size", "payload",
    ] {
        assert!(keys.contains(&key.to_string()), "missing {key}");
    }
    assert_eq!(json["size"], 66);
}

#[test]
fn test_record_json_roundtrip_preserves_fields() {
    let original = record();
    let text = serde_json::to_string(&original).unwrap();
    let parsed: PacketRecord = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, original);
}

#[test]
fn test_record_has_address() {
    let mut r = record();
    assert!(r.has_address());
    r.source_addr = NO_ADDRESS.into();
    r.dest_addr = NO_ADDRESS.into();
    r.source_port = NO_PORT.into();
    assert!(!r.has_address());
}

#[test]
fn test_record_involves() {
    let r = record();
    assert!(r.involves("10.0.0.2"));
    assert!(!r.involves("10.0.0.3"));
}
