//! Tests for the feed wire protocol

use super::*;

fn record(protocol: &str) -> PacketRecord {
    PacketRecord {
        captured_at: "09:15:02".into(),
        source_addr: "192.168.1.4".into(),
        dest_addr: "8.8.8.8".into(),
        protocol: protocol.into(),
        source_port: "53211".into(),
        dest_port: "53".into(),
        size_bytes: 74,
        payload_summary: "Query: example.com".into(),
    }
}

// ============================================================================
// SubscribeRequest
// ============================================================================

#[test]
fn test_blank_line_subscribes_to_everything() {
    assert_eq!(SubscribeRequest::from_line("").unwrap(), SubscribeRequest::new());
    assert_eq!(SubscribeRequest::from_line("  \n").unwrap(), SubscribeRequest::new());
    assert_eq!(SubscribeRequest::from_line("{}").unwrap(), SubscribeRequest::new());
}

#[test]
fn test_request_fields_parse() {
    let req = SubscribeRequest::from_line(
        r#"{"protocols":["dns","TCP"],"addresses":["8.8.8.8"],"last_n":10,"max_batches_per_sec":4}"#,
    )
    .unwrap();

    assert_eq!(req.protocols, Some(vec!["dns".to_string(), "TCP".to_string()]));
    assert_eq!(req.addresses, Some(vec!["8.8.8.8".to_string()]));
    assert_eq!(req.last_n, Some(10));
    assert_eq!(req.sample_rate, None);
    assert_eq!(req.max_batches_per_sec, Some(4));
}

#[test]
fn test_request_line_omits_unset_fields() {
    let line = SubscribeRequest::new().with_last_n(5).to_line().unwrap();
    assert_eq!(line, "{\"last_n\":5}\n");
}

#[test]
fn test_sample_rate_is_clamped() {
    assert_eq!(SubscribeRequest::new().with_sample_rate(3.0).sample_rate, Some(1.0));
    assert_eq!(SubscribeRequest::new().with_sample_rate(-1.0).sample_rate, Some(0.0));
}

#[test]
fn test_malformed_request_is_rejected() {
    assert!(SubscribeRequest::from_line("{\"protocols\":").is_err());
    assert!(SubscribeRequest::from_line("{\"last_n\":\"many\"}").is_err());
}

// ============================================================================
// FeedMessage
// ============================================================================

#[test]
fn test_events_are_payload_less() {
    assert_eq!(
        FeedMessage::CaptureStarted.to_line().unwrap(),
        "{\"event\":\"capture_started\"}\n"
    );
    assert_eq!(
        FeedMessage::Heartbeat.to_line().unwrap(),
        "{\"event\":\"heartbeat\"}\n"
    );
    assert_eq!(
        FeedMessage::from(SessionEvent::DataCleared),
        FeedMessage::DataCleared
    );
}

#[test]
fn test_packets_message_shape() {
    let line = FeedMessage::NewPackets {
        packets: vec![record("DNS")],
    }
    .to_line()
    .unwrap();

    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["event"], "new_packets");
    assert_eq!(value["packets"][0]["protocol"], "DNS");
    assert_eq!(value["packets"][0]["size"], 74);
    assert!(line.ends_with('\n'));
}

#[test]
fn test_decode_all_packets() {
    let msg = FeedMessage::AllPackets {
        packets: vec![record("DNS"), record("UDP")],
    };
    let decoded = FeedMessage::from_line(&msg.to_line().unwrap()).unwrap();
    assert_eq!(decoded, msg);
    assert_eq!(decoded.event_name(), "all_packets");
}

#[test]
fn test_unknown_event_is_rejected() {
    assert!(FeedMessage::from_line("{\"event\":\"pcap_analysis_started\"}").is_err());
}
