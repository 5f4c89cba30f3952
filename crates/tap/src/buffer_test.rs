//! Tests for the replay buffer

use super::*;

fn record(size: u64) -> PacketRecord {
    PacketRecord {
        captured_at: "10:00:00".into(),
        source_addr: "10.1.1.1".into(),
        dest_addr: "10.1.1.2".into(),
        protocol: "UDP".into(),
        source_port: "1000".into(),
        dest_port: "2000".into(),
        size_bytes: size,
        payload_summary: "Length: 12".into(),
    }
}

fn sizes(records: &[PacketRecord]) -> Vec<u64> {
    records.iter().map(|r| r.size_bytes).collect()
}

// ============================================================================
// Basic operations
// ============================================================================

#[test]
fn test_new_buffer_is_empty() {
    let buffer = ReplayBuffer::new();
    assert!(buffer.is_empty());
    assert_eq!(buffer.capacity(), DEFAULT_REPLAY_CAPACITY);
    assert_eq!(buffer.total_written(), 0);
    assert!(buffer.last_n(None).is_empty());
}

#[test]
fn test_last_n_is_oldest_first() {
    let mut buffer = ReplayBuffer::with_capacity(10);
    let records: Vec<_> = (1..=5).map(record).collect();
    buffer.extend(&records);

    assert_eq!(sizes(&buffer.last_n(Some(3))), vec![3, 4, 5]);
    assert_eq!(sizes(&buffer.last_n(None)), vec![1, 2, 3, 4, 5]);
    assert_eq!(sizes(&buffer.last_n(Some(50))), vec![1, 2, 3, 4, 5]);
    assert!(buffer.last_n(Some(0)).is_empty());
}

// ============================================================================
// Wraparound
// ============================================================================

#[test]
fn test_oldest_records_are_evicted() {
    let mut buffer = ReplayBuffer::with_capacity(3);
    let records: Vec<_> = (1..=7).map(record).collect();
    buffer.extend(&records);

    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer.total_written(), 7);
    assert_eq!(sizes(&buffer.last_n(None)), vec![5, 6, 7]);
}

#[test]
fn test_capacity_is_clamped() {
    assert_eq!(ReplayBuffer::with_capacity(0).capacity(), 1);
    assert_eq!(ReplayBuffer::with_capacity(usize::MAX).capacity(), 100_000);
}

#[test]
fn test_clear_resets() {
    let mut buffer = ReplayBuffer::with_capacity(3);
    buffer.extend(&[record(1), record(2)]);
    buffer.clear();

    assert!(buffer.is_empty());
    assert_eq!(buffer.total_written(), 0);
}
