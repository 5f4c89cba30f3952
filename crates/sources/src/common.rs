//! Common metrics shared across source types

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics shared by all source types
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Packets handed to the worker
    pub packets_read: AtomicU64,

    /// Sum of reported wire lengths
    pub bytes_read: AtomicU64,

    /// Records skipped because they could not be decoded
    pub malformed: AtomicU64,

    /// Sources opened
    pub opened: AtomicU64,

    /// Sources closed
    pub closed: AtomicU64,
}

impl SourceMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            packets_read: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            opened: AtomicU64::new(0),
            closed: AtomicU64::new(0),
        }
    }

    /// Record a packet read
    #[inline]
    pub fn packet_read(&self, bytes: u64) {
        self.packets_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a skipped record
    #[inline]
    pub fn malformed_record(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn source_opened(&self) {
        self.opened.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn source_closed(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_read: self.packets_read.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            opened: self.opened.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub packets_read: u64,
    pub bytes_read: u64,
    pub malformed: u64,
    pub opened: u64,
    pub closed: u64,
}
