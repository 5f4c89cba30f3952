//! Tests for the decoded packet model

use chrono::{TimeZone, Utc};

use crate::packet::{DecodedPacket, Layer};

fn at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap()
}

// =============================================================================
// Layer lookups
// =============================================================================

#[test]
fn test_layer_name_is_lowercased() {
    let layer = Layer::new("DNS");
    assert_eq!(layer.name(), "dns");
}

#[test]
fn test_layer_get_case_insensitive() {
    let layer = Layer::new("ip").with("src", "10.0.0.1");
    assert_eq!(layer.get("SRC"), Some("10.0.0.1"));
    assert_eq!(layer.get("dst"), None);
}

#[test]
fn test_layer_get_non_empty_skips_blank() {
    let layer = Layer::new("http").with("host", "  ");
    assert_eq!(layer.get("host"), Some("  "));
    assert_eq!(layer.get_non_empty("host"), None);
}

#[test]
fn test_layer_first_non_empty_respects_order() {
    let layer = Layer::new("tls")
        .with("record", "")
        .with("handshake_type", "1")
        .with("sni", "example.com");
    assert_eq!(layer.first_non_empty(), Some(("handshake_type", "1")));
}

#[test]
fn test_layer_get_all_returns_repeated_fields() {
    let layer = Layer::new("dns")
        .with("a", "1.1.1.1")
        .with("qry_name", "x")
        .with("a", "1.0.0.1");
    let values: Vec<_> = layer.get_all("a").collect();
    assert_eq!(values, vec!["1.1.1.1", "1.0.0.1"]);
}

#[test]
fn test_layer_parse_u64_decimal_and_hex() {
    let layer = Layer::new("tcp").with("seq", "42").with("flags", "0x0018");
    assert_eq!(layer.parse_u64("seq").unwrap().unwrap(), 42);
    assert_eq!(layer.parse_u64("flags").unwrap().unwrap(), 0x18);
    assert!(layer.parse_u64("missing").is_none());
}

#[test]
fn test_layer_parse_u64_invalid() {
    let layer = Layer::new("arp").with("opcode", "request");
    assert!(layer.parse_u64("opcode").unwrap().is_err());
}

#[test]
fn test_layer_bytes_with_separators() {
    let layer = Layer::new("udp").with("payload", "de:ad:be:ef");
    assert_eq!(
        layer.bytes("payload").unwrap().unwrap(),
        vec![0xde, 0xad, 0xbe, 0xef]
    );
}

#[test]
fn test_layer_bytes_invalid_hex() {
    let layer = Layer::new("data").with("data", "zz");
    assert!(layer.bytes("data").unwrap().is_err());
}

// =============================================================================
// DecodedPacket builder
// =============================================================================

#[test]
fn test_packet_builder_tracks_highest_and_transport() {
    let packet = DecodedPacket::new(at())
        .with_length(74)
        .with_layer(Layer::new("eth"))
        .with_layer(Layer::new("ip").with("src", "10.0.0.1"))
        .with_layer(Layer::new("udp").with("srcport", "5353"))
        .with_layer(Layer::new("mdns"));

    assert_eq!(packet.highest_layer, "MDNS");
    assert_eq!(packet.transport_layer.as_deref(), Some("UDP"));
    assert_eq!(packet.transport().unwrap().get("srcport"), Some("5353"));
    assert_eq!(packet.length, Some(74));
}

#[test]
fn test_packet_highest_layer_override() {
    let packet = DecodedPacket::new(at())
        .with_layer(Layer::new("tcp"))
        .with_layer(Layer::new("tls"))
        .with_highest_layer("tls");
    assert_eq!(packet.highest_layer, "TLS");
}

#[test]
fn test_packet_network_prefers_ipv4() {
    let packet = DecodedPacket::new(at())
        .with_layer(Layer::new("ipv6").with("src", "::1"))
        .with_layer(Layer::new("ip").with("src", "127.0.0.1"));
    assert_eq!(packet.network().unwrap().get("src"), Some("127.0.0.1"));
}

#[test]
fn test_packet_field_lookup_missing_layer() {
    let packet = DecodedPacket::new(at()).with_layer(Layer::new("arp"));
    assert_eq!(packet.field("ip", "src"), None);
    assert!(packet.network().is_none());
    assert!(packet.transport().is_none());
}
