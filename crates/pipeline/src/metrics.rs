//! Pipeline metrics
//!
//! Atomic counters for the ingestion worker and the fan-out.
//! All operations use relaxed ordering; values are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion worker counters, shared across sessions
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Packets pulled from the source
    packets_seen: AtomicU64,

    /// Packets discarded while paused
    packets_paused: AtomicU64,

    /// Packets rejected by the worker-side filter
    packets_filtered: AtomicU64,

    /// Packets that produced a record
    records_classified: AtomicU64,

    /// Packets skipped because classification failed
    packets_skipped: AtomicU64,

    /// Records the channel refused (drop-newest overflow)
    records_dropped: AtomicU64,

    /// Snapshot flushes attempted
    flushes: AtomicU64,

    /// Snapshot flushes that failed
    flush_failures: AtomicU64,
}

impl PipelineMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            packets_seen: AtomicU64::new(0),
            packets_paused: AtomicU64::new(0),
            packets_filtered: AtomicU64::new(0),
            records_classified: AtomicU64::new(0),
            packets_skipped: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_seen(&self) {
        self.packets_seen.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_paused(&self) {
        self.packets_paused.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_filtered(&self) {
        self.packets_filtered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_classified(&self) {
        self.records_classified.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_skipped(&self) {
        self.packets_skipped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a snapshot flush and whether it succeeded
    #[inline]
    pub fn record_flush(&self, ok: bool) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.flush_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records dropped so far
    #[inline]
    pub fn records_dropped(&self) -> u64 {
        self.records_dropped.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_seen: self.packets_seen.load(Ordering::Relaxed),
            packets_paused: self.packets_paused.load(Ordering::Relaxed),
            packets_filtered: self.packets_filtered.load(Ordering::Relaxed),
            records_classified: self.records_classified.load(Ordering::Relaxed),
            packets_skipped: self.packets_skipped.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `PipelineMetrics`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub packets_seen: u64,
    pub packets_paused: u64,
    pub packets_filtered: u64,
    pub records_classified: u64,
    pub packets_skipped: u64,
    pub records_dropped: u64,
    pub flushes: u64,
    pub flush_failures: u64,
}

/// Fan-out counters
#[derive(Debug, Default)]
pub struct FanOutMetrics {
    batches: AtomicU64,
    records: AtomicU64,
    deliveries: AtomicU64,
    consumer_errors: AtomicU64,
    events: AtomicU64,
}

impl FanOutMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            batches: AtomicU64::new(0),
            records: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            consumer_errors: AtomicU64::new(0),
            events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_batch(&self, records: u64) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.records.fetch_add(records, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_consumer_error(&self) {
        self.consumer_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_event(&self) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FanOutSnapshot {
        FanOutSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            consumer_errors: self.consumer_errors.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `FanOutMetrics`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutSnapshot {
    pub batches: u64,
    pub records: u64,
    pub deliveries: u64,
    pub consumer_errors: u64,
    pub events: u64,
}

// ============================================================================
// Backpressure Tracker - Rate-limited logging of channel drops
// ============================================================================

/// Rate-limited drop logging
///
/// Aggregates drop events and logs a summary at most once per second instead
/// of once per record.
///
/// # Thresholds
///
/// - >0 drops/sec: WARN level
/// - >100 drops/sec: ERROR level (consumers cannot keep up)
pub struct BackpressureTracker {
    /// Drops in current interval
    interval_drops: AtomicU64,
    /// Last log time (epoch milliseconds)
    last_log_ms: AtomicU64,
}

/// Log interval in milliseconds
const LOG_INTERVAL_MS: u64 = 1000;
/// Drops/sec that triggers ERROR level
const CRITICAL_DROP_THRESHOLD: u64 = 100;

impl BackpressureTracker {
    pub fn new() -> Self {
        Self {
            interval_drops: AtomicU64::new(0),
            last_log_ms: AtomicU64::new(Self::now_ms()),
        }
    }

    /// Record a dropped record; returns true if a log line was emitted
    pub fn record_drop(&self) -> bool {
        self.interval_drops.fetch_add(1, Ordering::Relaxed);
        self.maybe_log()
    }

    fn maybe_log(&self) -> bool {
        let now = Self::now_ms();
        let last = self.last_log_ms.load(Ordering::Relaxed);

        if now.saturating_sub(last) < LOG_INTERVAL_MS {
            return false;
        }

        // claim the log slot so concurrent callers do not log twice
        if self
            .last_log_ms
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        let drops = self.interval_drops.swap(0, Ordering::Relaxed);
        Self::report(drops)
    }

    /// Log whatever the current interval holds; called when a session ends
    /// so a last burst is not lost. Returns the drops reported.
    pub fn flush(&self) -> u64 {
        self.last_log_ms.store(Self::now_ms(), Ordering::Relaxed);
        let drops = self.interval_drops.swap(0, Ordering::Relaxed);
        Self::report(drops);
        drops
    }

    fn report(drops: u64) -> bool {
        if drops == 0 {
            return false;
        }

        if drops > CRITICAL_DROP_THRESHOLD {
            tracing::error!(
                dropped_records = drops,
                threshold = CRITICAL_DROP_THRESHOLD,
                "distribution channel saturated: consumers cannot keep up"
            );
        } else {
            tracing::warn!(
                dropped_records = drops,
                "distribution channel full: records dropped in last interval"
            );
        }
        true
    }

    #[inline]
    fn now_ms() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub fn current_drops(&self) -> u64 {
        self.interval_drops.load(Ordering::Relaxed)
    }
}

impl Default for BackpressureTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BackpressureTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackpressureTracker")
            .field(
                "interval_drops",
                &self.interval_drops.load(Ordering::Relaxed),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // BackpressureTracker Tests
    // ========================================================================

    #[test]
    fn test_backpressure_tracker_record_drop() {
        let tracker = BackpressureTracker::new();

        // within the first interval nothing is logged
        assert!(!tracker.record_drop());
        assert!(!tracker.record_drop());

        assert_eq!(tracker.current_drops(), 2);
    }

    #[test]
    fn test_backpressure_tracker_flush_reports_pending_burst() {
        let tracker = BackpressureTracker::new();
        for _ in 0..7 {
            assert!(!tracker.record_drop());
        }

        assert_eq!(tracker.flush(), 7);
        assert_eq!(tracker.current_drops(), 0);
        assert_eq!(tracker.flush(), 0);
    }

    #[test]
    fn test_backpressure_tracker_debug() {
        let tracker = BackpressureTracker::default();
        tracker.record_drop();

        let debug = format!("{:?}", tracker);
        assert!(debug.contains("interval_drops"));
    }

    // ========================================================================
    // PipelineMetrics Tests
    // ========================================================================

    #[test]
    fn test_pipeline_metrics_counters() {
        let metrics = PipelineMetrics::new();

        metrics.record_seen();
        metrics.record_seen();
        metrics.record_paused();
        metrics.record_filtered();
        metrics.record_classified();
        metrics.record_skipped();
        metrics.record_dropped();
        metrics.record_flush(true);
        metrics.record_flush(false);

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                packets_seen: 2,
                packets_paused: 1,
                packets_filtered: 1,
                records_classified: 1,
                packets_skipped: 1,
                records_dropped: 1,
                flushes: 2,
                flush_failures: 1,
            }
        );
        assert_eq!(metrics.records_dropped(), 1);
    }

    #[test]
    fn test_fanout_metrics_counters() {
        let metrics = FanOutMetrics::new();

        metrics.record_batch(50);
        metrics.record_batch(3);
        metrics.record_delivery();
        metrics.record_consumer_error();
        metrics.record_event();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches, 2);
        assert_eq!(snapshot.records, 53);
        assert_eq!(snapshot.deliveries, 1);
        assert_eq!(snapshot.consumer_errors, 1);
        assert_eq!(snapshot.events, 1);
    }
}
