//! Tests for display filters

use chrono::Utc;

use sift_protocol::{DecodedPacket, Layer};

use super::parser::MAX_DEPTH;
use super::{DisplayFilter, FilterError};

fn dns_query() -> DecodedPacket {
    DecodedPacket::new(Utc::now())
        .with_length(74)
        .with_layer(Layer::new("eth"))
        .with_layer(Layer::new("ip").with("src", "10.0.0.5").with("dst", "8.8.8.8"))
        .with_layer(
            Layer::new("udp")
                .with("srcport", "53124")
                .with("dstport", "53"),
        )
        .with_layer(
            Layer::new("dns")
                .with("qry_name", "example.com")
                .with("flags_response", "0"),
        )
}

fn https_ack() -> DecodedPacket {
    DecodedPacket::new(Utc::now())
        .with_length(1514)
        .with_layer(Layer::new("ip").with("src", "10.0.0.5").with("dst", "93.184.216.34"))
        .with_layer(
            Layer::new("tcp")
                .with("srcport", "51000")
                .with("dstport", "443")
                .with("flags", "0x0010"),
        )
}

fn matches(filter: &str, packet: &DecodedPacket) -> bool {
    DisplayFilter::parse(filter).unwrap().matches(packet)
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_blank_filter_matches_all() {
    let filter = DisplayFilter::parse("   ").unwrap();
    assert!(filter.is_match_all());
    assert!(filter.matches(&dns_query()));
    assert_eq!(filter.as_str(), "");
}

#[test]
fn test_filter_text_is_trimmed() {
    let filter: DisplayFilter = "  tcp  ".parse().unwrap();
    assert_eq!(filter.to_string(), "tcp");
}

#[test]
fn test_parse_errors() {
    assert_eq!(DisplayFilter::parse("tcp and").unwrap_err(), FilterError::UnexpectedEnd);
    assert_eq!(DisplayFilter::parse("(tcp").unwrap_err(), FilterError::UnexpectedEnd);
    assert!(matches!(
        DisplayFilter::parse("ip.src == \"10.0").unwrap_err(),
        FilterError::UnterminatedString { pos: 10 }
    ));
    assert!(matches!(
        DisplayFilter::parse("tcp $ udp").unwrap_err(),
        FilterError::InvalidCharacter { ch: '$', .. }
    ));
    assert!(matches!(
        DisplayFilter::parse("tcp udp").unwrap_err(),
        FilterError::UnexpectedToken { pos: 4, .. }
    ));
    assert!(matches!(
        DisplayFilter::parse("== 5").unwrap_err(),
        FilterError::UnexpectedToken { pos: 0, .. }
    ));
}

#[test]
fn test_deep_nesting_is_rejected() {
    let deep = format!("{}udp{}", "(".repeat(100_000), ")".repeat(100_000));
    assert_eq!(
        DisplayFilter::parse(&deep).unwrap_err(),
        FilterError::TooDeep {
            pos: MAX_DEPTH,
            max: MAX_DEPTH
        }
    );

    let nots = format!("{}udp", "not ".repeat(MAX_DEPTH + 1));
    assert!(matches!(
        DisplayFilter::parse(&nots).unwrap_err(),
        FilterError::TooDeep { .. }
    ));
}

#[test]
fn test_nesting_at_limit_parses() {
    let parens = format!("{}udp{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
    assert!(matches(&parens, &dns_query()));

    let nots = format!("{}udp", "not ".repeat(MAX_DEPTH));
    assert!(matches(&nots, &dns_query()));
}

#[test]
fn test_long_chains_stay_flat() {
    let ands = vec!["udp"; 50_000].join(" and ");
    assert!(matches(&ands, &dns_query()));

    let ors = format!("{} or dns", vec!["tcp"; 50_000].join(" or "));
    assert!(matches(&ors, &dns_query()));
}

// =============================================================================
// Evaluation
// =============================================================================

#[test]
fn test_protocol_presence() {
    assert!(matches("dns", &dns_query()));
    assert!(matches("udp", &dns_query()));
    assert!(!matches("tcp", &dns_query()));
    assert!(matches("ip", &https_ack()));
}

#[test]
fn test_address_fields() {
    assert!(matches("ip.src == 10.0.0.5", &dns_query()));
    assert!(matches("ip.addr == 8.8.8.8", &dns_query()));
    assert!(!matches("ip.dst == 10.0.0.5", &dns_query()));
}

#[test]
fn test_port_fields() {
    assert!(matches("tcp.port == 443", &https_ack()));
    assert!(matches("udp.port == 53", &dns_query()));
    assert!(!matches("tcp.port == 443", &dns_query()));
    assert!(matches("tcp.dstport >= 400 && tcp.dstport < 500", &https_ack()));
}

#[test]
fn test_not_equal_requires_field() {
    assert!(matches("tcp.port != 80", &https_ack()));
    assert!(!matches("tcp.port != 443", &https_ack()));
    assert!(!matches("tcp.port != 80", &dns_query()));
}

#[test]
fn test_frame_length_comparison() {
    assert!(matches("frame.len > 1000", &https_ack()));
    assert!(!matches("frame.len gt 1000", &dns_query()));
    assert!(matches("frame.len le 74", &dns_query()));
}

#[test]
fn test_hex_numeric_comparison() {
    assert!(matches("tcp.flags == 16", &https_ack()));
    assert!(matches("tcp.flags == 0x10", &https_ack()));
}

#[test]
fn test_dotted_field_maps_to_flat_name() {
    assert!(matches("dns.qry.name == example.com", &dns_query()));
    assert!(matches("dns.qry_name contains \"ample\"", &dns_query()));
    assert!(matches("dns.flags_response", &dns_query()));
}

#[test]
fn test_boolean_logic_and_precedence() {
    assert!(matches("tcp or dns", &dns_query()));
    assert!(matches("not tcp", &dns_query()));
    assert!(matches("!tcp and udp", &dns_query()));
    // `and` binds tighter than `or`
    assert!(matches("dns or tcp and tcp.port == 1", &dns_query()));
    assert!(!matches("(dns or tcp) and tcp.port == 1", &dns_query()));
}
