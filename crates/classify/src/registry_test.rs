//! Tests for the summarizer registry

use sift_protocol::DecodedPacket;

use super::SummarizerRegistry;
use crate::error::Result;

fn custom(_packet: &DecodedPacket) -> Result<Option<String>> {
    Ok(Some("custom".to_string()))
}

#[test]
fn test_defaults_cover_builtin_protocols() {
    let registry = SummarizerRegistry::with_defaults();
    assert_eq!(
        registry.tags(),
        vec!["ARP", "DNP3", "DNS", "HTTP", "ICMP", "MDNS", "MODBUS", "S7COMM", "TCP", "UDP"]
    );
}

#[test]
fn test_lookup_is_case_insensitive() {
    let registry = SummarizerRegistry::with_defaults();
    assert!(registry.get("modbus").is_some());
    assert!(registry.contains("Dnp3"));
}

#[test]
fn test_register_replaces_existing() {
    let mut registry = SummarizerRegistry::with_defaults();
    let previous = registry.register("dns", custom);
    assert!(previous.is_some());

    let packet = DecodedPacket::new(chrono::Utc::now());
    let summarize = registry.get("DNS").unwrap();
    assert_eq!(summarize(&packet).unwrap().as_deref(), Some("custom"));
}

#[test]
fn test_try_register_refuses_duplicates() {
    let mut registry = SummarizerRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.try_register("gopher", custom));
    assert!(!registry.try_register("GOPHER", custom));
    assert_eq!(registry.len(), 1);
}
