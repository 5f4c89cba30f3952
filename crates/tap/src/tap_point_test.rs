//! Tests for TapPoint

use super::*;

fn record(protocol: &str, size: u64) -> PacketRecord {
    PacketRecord {
        captured_at: "10:00:00".into(),
        source_addr: "10.0.0.1".into(),
        dest_addr: "10.0.0.2".into(),
        protocol: protocol.into(),
        source_port: "-".into(),
        dest_port: "-".into(),
        size_bytes: size,
        payload_summary: "N/A".into(),
    }
}

fn batch(records: Vec<PacketRecord>) -> RecordBatch {
    RecordBatch::from(records)
}

// ============================================================================
// Replay history
// ============================================================================

#[test]
fn test_history_is_buffered_without_subscribers() {
    let tap = TapPoint::with_replay_capacity(4);
    tap.tap(&batch((1..=6).map(|n| record("UDP", n)).collect()));

    let stats = tap.stats();
    assert_eq!(stats.tapped_batches, 1);
    assert_eq!(stats.tapped_records, 6);
    assert_eq!(stats.replay_len, 4);
    assert_eq!(stats.sent_count, 0);
}

#[tokio::test]
async fn test_subscribe_receives_filtered_history() {
    let tap = TapPoint::new();
    tap.tap(&batch(vec![
        record("DNS", 1),
        record("TCP", 2),
        record("DNS", 3),
        record("DNS", 4),
    ]));

    let sub = tap
        .subscribe(&SubscribeRequest::new().with_protocols(["dns"]).with_last_n(3))
        .unwrap();
    let sizes: Vec<u64> = sub.history.iter().map(|r| r.size_bytes).collect();
    assert_eq!(sizes, vec![3, 4]);
}

#[tokio::test]
async fn test_capture_start_clears_history() {
    let tap = TapPoint::new();
    tap.tap(&batch(vec![record("TCP", 1)]));
    tap.notify(SessionEvent::CaptureStarted).unwrap();

    let sub = tap.subscribe(&SubscribeRequest::new()).unwrap();
    assert!(sub.history.is_empty());

    tap.tap(&batch(vec![record("TCP", 2)]));
    tap.notify(SessionEvent::CaptureStopped).unwrap();
    assert_eq!(tap.stats().replay_len, 1);
}

// ============================================================================
// Live stream
// ============================================================================

#[tokio::test]
async fn test_live_batches_follow_history() {
    let tap = TapPoint::new();
    tap.tap(&batch(vec![record("UDP", 1)]));

    let mut sub = tap.subscribe(&SubscribeRequest::new()).unwrap();
    assert_eq!(sub.history.len(), 1);

    tap.deliver(&batch(vec![record("UDP", 2), record("UDP", 3)]))
        .unwrap();
    tap.notify(SessionEvent::DataCleared).unwrap();

    let TapItem::Packets(live) = sub.receiver.recv().await.unwrap() else {
        panic!("expected packets");
    };
    assert_eq!(live.iter().map(|r| r.size_bytes).collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(
        sub.receiver.recv().await.unwrap(),
        TapItem::Event(SessionEvent::DataCleared)
    );
    assert_eq!(tap.stats().sent_count, 1);
}

#[tokio::test]
async fn test_unsubscribe_and_cleanup() {
    let tap = TapPoint::new();
    let first = tap.subscribe(&SubscribeRequest::new()).unwrap();
    let second = tap.subscribe(&SubscribeRequest::new()).unwrap();
    assert_eq!(tap.subscriber_count(), 2);

    tap.unsubscribe(first.id).unwrap();
    drop(second.receiver);
    assert_eq!(tap.cleanup(), 1);
    assert!(!tap.has_subscribers());
}

#[tokio::test]
async fn test_maintenance_stops_on_shutdown() {
    let tap = Arc::new(TapPoint::new());
    let shutdown = CancellationToken::new();
    let handle = tap.spawn_maintenance(shutdown.clone());

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}
