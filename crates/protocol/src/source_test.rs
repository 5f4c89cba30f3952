//! Tests for SourceId type

use crate::source::SourceId;
use std::collections::HashSet;

// =============================================================================
// SourceId::new tests
// =============================================================================

#[test]
fn test_source_id_new_from_str() {
    let id = SourceId::new("eth0");
    assert_eq!(id.as_str(), "eth0");
}

#[test]
fn test_source_id_empty_and_blank() {
    assert!(SourceId::new("").is_empty());
    assert!(SourceId::new("   ").is_empty());
    assert!(!SourceId::new("lo").is_empty());
}

#[test]
fn test_source_id_display() {
    let id = SourceId::new("captures/morning.ndjson");
    assert_eq!(format!("{}", id), "captures/morning.ndjson");
}

// =============================================================================
// Sanitization tests
// =============================================================================

#[test]
fn test_sanitized_replaces_reserved_chars() {
    let id = SourceId::new(r#"\Device\NPF_{ABC:1}*?"<>|"#);
    assert_eq!(id.sanitized(), "_Device_NPF__ABC_1_______");
}

#[test]
fn test_sanitized_keeps_plain_names() {
    assert_eq!(SourceId::new("wlan0").sanitized(), "wlan0");
}

// =============================================================================
// Hash and conversion tests
// =============================================================================

#[test]
fn test_source_id_in_hashset() {
    let mut set = HashSet::new();
    set.insert(SourceId::from("eth0"));
    set.insert(SourceId::from(String::from("eth0")));
    set.insert(SourceId::from("eth1"));
    assert_eq!(set.len(), 2);
}
