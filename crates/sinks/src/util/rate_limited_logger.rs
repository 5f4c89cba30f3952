//! Rate-limited logging utility
//!
//! Prevents log spam under heavy error conditions by limiting log frequency:
//! logs at most once per interval, with a count of what was suppressed in
//! between. Used for snapshot flush failures and channel drops, both of which
//! can fire once per packet.
//!
//! # Example
//!
//! ```ignore
//! use sift_sinks::util::RateLimitedLogger;
//! use std::time::Duration;
//!
//! let logger = RateLimitedLogger::new(Duration::from_secs(10));
//!
//! // Only logs once per 10 seconds, even if called frequently
//! for _ in 0..1000 {
//!     logger.error("snapshot flush failed", &io_error);
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval for rate-limited logging
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Rate-limited logger that prevents log spam
///
/// Thread-safe: atomic counters plus a mutex for the last log time.
pub struct RateLimitedLogger {
    /// Minimum interval between log lines
    min_interval: Duration,

    /// Last time we logged
    last_log_time: Mutex<Option<Instant>>,

    /// Occurrences since the last log line
    pending: AtomicU64,

    /// Occurrences ever recorded
    total: AtomicU64,
}

impl RateLimitedLogger {
    /// Create a new rate-limited logger with the specified interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log_time: Mutex::new(None),
            pending: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Record an error; returns true if a line was emitted
    pub fn error(&self, message: &str, error: &dyn fmt::Display) -> bool {
        let Some((count, total)) = self.tick() else {
            return false;
        };
        if count > 1 {
            tracing::error!(
                message = %message,
                error = %error,
                suppressed_count = count - 1,
                total_errors = total,
                "error (rate-limited)"
            );
        } else {
            tracing::error!(message = %message, error = %error, total_errors = total, "error");
        }
        true
    }

    /// Record a warning; returns true if a line was emitted
    pub fn warn(&self, message: &str, detail: &dyn fmt::Display) -> bool {
        let Some((count, total)) = self.tick() else {
            return false;
        };
        if count > 1 {
            tracing::warn!(
                message = %message,
                detail = %detail,
                suppressed_count = count - 1,
                total = total,
                "warning (rate-limited)"
            );
        } else {
            tracing::warn!(message = %message, detail = %detail, total = total, "warning");
        }
        true
    }

    /// Count one occurrence; `Some((since_last, total))` when due to log
    fn tick(&self) -> Option<(u64, u64)> {
        self.pending.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);

        let should_log = {
            let mut last_time = self.last_log_time.lock();
            let now = Instant::now();
            match *last_time {
                Some(last) if now.duration_since(last) < self.min_interval => false,
                _ => {
                    *last_time = Some(now);
                    true
                }
            }
        };

        should_log.then(|| {
            (
                self.pending.swap(0, Ordering::Relaxed),
                self.total.load(Ordering::Relaxed),
            )
        })
    }

    /// Occurrences since the last emitted line
    pub fn pending_count(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    /// Occurrences ever recorded
    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.pending.store(0, Ordering::Relaxed);
        self.total.store(0, Ordering::Relaxed);
        *self.last_log_time.lock() = None;
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}

impl fmt::Debug for RateLimitedLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitedLogger")
            .field("min_interval", &self.min_interval)
            .field("total", &self.total_count())
            .finish()
    }
}
