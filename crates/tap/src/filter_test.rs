//! Tests for TapFilter

use std::sync::Arc;

use super::*;

fn record(protocol: &str, src: &str, dst: &str) -> PacketRecord {
    PacketRecord {
        captured_at: "10:00:00".into(),
        source_addr: src.into(),
        dest_addr: dst.into(),
        protocol: protocol.into(),
        source_port: "-".into(),
        dest_port: "-".into(),
        size_bytes: 60,
        payload_summary: "N/A".into(),
    }
}

// ============================================================================
// Empty filter
// ============================================================================

#[test]
fn test_empty_filter_matches_all() {
    let filter = TapFilter::new();
    assert!(filter.is_empty());
    assert!(filter.matches(&record("ARP", "N/A", "N/A")));
}

#[test]
fn test_empty_filter_shares_batch() {
    let batch = RecordBatch::from(vec![record("TCP", "a", "b")]);
    let applied = TapFilter::new().apply(&batch).unwrap();
    assert!(Arc::ptr_eq(&batch, &applied));
}

#[test]
fn test_request_without_filters_is_empty() {
    assert!(TapFilter::from_subscribe(&SubscribeRequest::new()).is_empty());
}

// ============================================================================
// Protocol and address filters
// ============================================================================

#[test]
fn test_protocols_are_case_insensitive() {
    let filter = TapFilter::new().with_protocols(["dns", " Tcp "]);
    assert!(filter.matches(&record("DNS", "a", "b")));
    assert!(filter.matches(&record("TCP", "a", "b")));
    assert!(!filter.matches(&record("UDP", "a", "b")));
}

#[test]
fn test_address_matches_either_side() {
    let filter = TapFilter::new().with_addresses(["10.0.0.5"]);
    assert!(filter.matches(&record("TCP", "10.0.0.5", "10.0.0.9")));
    assert!(filter.matches(&record("TCP", "10.0.0.9", "10.0.0.5")));
    assert!(!filter.matches(&record("TCP", "10.0.0.8", "10.0.0.9")));
}

#[test]
fn test_filters_are_anded() {
    let req = SubscribeRequest::new()
        .with_protocols(["DNS"])
        .with_addresses(["8.8.8.8"]);
    let filter = TapFilter::from_subscribe(&req);

    assert!(filter.matches(&record("DNS", "10.0.0.1", "8.8.8.8")));
    assert!(!filter.matches(&record("TCP", "10.0.0.1", "8.8.8.8")));
    assert!(!filter.matches(&record("DNS", "10.0.0.1", "1.1.1.1")));
}

#[test]
fn test_apply_keeps_matching_records_in_order() {
    let filter = TapFilter::new().with_protocols(["UDP"]);
    let batch = RecordBatch::from(vec![
        record("UDP", "1", "x"),
        record("TCP", "2", "x"),
        record("UDP", "3", "x"),
    ]);

    let applied = filter.apply(&batch).unwrap();
    let sources: Vec<_> = applied.iter().map(|r| r.source_addr.as_str()).collect();
    assert_eq!(sources, vec!["1", "3"]);

    let none = RecordBatch::from(vec![record("ARP", "4", "x")]);
    assert!(filter.apply(&none).is_none());
}
