//! Snapshot store tests

use std::fs;

use sift_protocol::PacketRecord;

use super::{Accumulation, SnapshotConfig, SnapshotStore, load_records, load_usage};

fn record(ts: &str, protocol: &str, size: u64) -> PacketRecord {
    PacketRecord {
        captured_at: ts.into(),
        source_addr: "10.0.0.1".into(),
        dest_addr: "10.0.0.2".into(),
        protocol: protocol.into(),
        source_port: "5000".into(),
        dest_port: "53".into(),
        size_bytes: size,
        payload_summary: "Len: 12".into(),
    }
}

fn store() -> (tempfile::TempDir, SnapshotStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::open(&SnapshotConfig::in_dir(dir.path())).unwrap();
    (dir, store)
}

// ============================================================================
// Accumulation
// ============================================================================

#[test]
fn test_accumulation_usage_buckets() {
    let mut acc = Accumulation::new(0);
    acc.push(record("12:00:01", "UDP", 100));
    acc.push(record("12:00:01", "UDP", 50));
    acc.push(record("12:00:02", "TCP", 60));

    assert_eq!(acc.len(), 3);
    assert_eq!(acc.usage().get("12:00:01"), Some(150));
    assert_eq!(acc.usage().get("12:00:02"), Some(60));
    assert_eq!(acc.usage().total_bytes(), 210);
}

#[test]
fn test_accumulation_retention_evicts_oldest() {
    let mut acc = Accumulation::new(2);
    acc.push(record("12:00:01", "UDP", 1));
    acc.push(record("12:00:02", "UDP", 2));
    acc.push(record("12:00:03", "UDP", 3));

    let kept: Vec<_> = acc.records().map(|r| r.size_bytes).collect();
    assert_eq!(kept, vec![2, 3]);
    assert_eq!(acc.appended(), 3);
    assert_eq!(acc.evicted(), 1);
    // usage still counts the evicted record
    assert_eq!(acc.usage().total_bytes(), 6);
}

#[test]
fn test_accumulation_tail_and_clear() {
    let mut acc = Accumulation::new(0);
    for size in 1..=5 {
        acc.push(record("12:00:01", "UDP", size));
    }

    let tail: Vec<_> = acc.tail(2).into_iter().map(|r| r.size_bytes).collect();
    assert_eq!(tail, vec![4, 5]);
    assert_eq!(acc.tail(10).len(), 5);

    acc.clear();
    assert!(acc.is_empty());
    assert!(acc.usage().is_empty());
    assert_eq!(acc.appended(), 0);
}

#[test]
fn test_accumulation_protocol_counts() {
    let mut acc = Accumulation::new(0);
    acc.push(record("12:00:01", "TCP", 1));
    acc.push(record("12:00:01", "DNS", 1));
    acc.push(record("12:00:01", "TCP", 1));
    acc.push(record("12:00:01", "ARP", 1));

    assert_eq!(
        acc.protocol_counts(),
        vec![("TCP".to_string(), 2), ("ARP".to_string(), 1), ("DNS".to_string(), 1)]
    );
}

// ============================================================================
// Store
// ============================================================================

#[test]
fn test_flush_writes_both_artifacts() {
    let (_dir, store) = store();
    let mut acc = Accumulation::new(0);
    acc.push(record("12:00:01", "UDP", 100));

    store.flush(&acc).unwrap();

    let packets = fs::read_to_string(store.packets_path()).unwrap();
    assert!(packets.starts_with("{\n    \"packets\": [\n        {\n            \"timestamp\": \"12:00:01\","));

    let usage = fs::read_to_string(store.usage_path()).unwrap();
    assert_eq!(
        usage,
        "[\n    {\n        \"timestamp\": \"12:00:01\",\n        \"data_usage\": \"100\"\n    }\n]"
    );
}

#[test]
fn test_double_flush_is_byte_identical() {
    let (_dir, store) = store();
    let mut acc = Accumulation::new(0);
    acc.push(record("12:00:01", "UDP", 100));
    acc.push(record("12:00:02", "TCP", 70));

    store.flush(&acc).unwrap();
    let first = (
        fs::read(store.packets_path()).unwrap(),
        fs::read(store.usage_path()).unwrap(),
    );

    store.flush(&acc).unwrap();
    let second = (
        fs::read(store.packets_path()).unwrap(),
        fs::read(store.usage_path()).unwrap(),
    );

    assert_eq!(first, second);
    assert_eq!(store.metrics().snapshot().flushes, 2);
}

#[test]
fn test_reset_writes_empty_shapes() {
    let (_dir, store) = store();
    let mut acc = Accumulation::new(0);
    acc.push(record("12:00:01", "UDP", 100));
    store.flush(&acc).unwrap();

    store.reset().unwrap();

    assert_eq!(
        fs::read_to_string(store.packets_path()).unwrap(),
        "{\n    \"packets\": []\n}"
    );
    assert_eq!(fs::read_to_string(store.usage_path()).unwrap(), "[]");
}

#[test]
fn test_load_round_trip() {
    let (_dir, store) = store();
    let mut acc = Accumulation::new(0);
    acc.push(record("12:00:01", "UDP", 100));
    acc.push(record("12:00:03", "DNS", 80));
    store.flush(&acc).unwrap();

    assert_eq!(load_records(store.packets_path()).unwrap(), acc.to_vec());
    assert_eq!(&load_usage(store.usage_path()).unwrap(), acc.usage());
}

#[test]
fn test_flush_failure_is_logged_not_raised() {
    let (dir, store) = store();
    let acc = Accumulation::new(0);

    // the artifact directory disappears underneath the store
    drop(dir);

    assert!(!store.flush_or_log(&acc));
    assert_eq!(store.metrics().snapshot().failed_flushes, 1);
}
