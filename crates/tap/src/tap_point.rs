//! TapPoint - the fan-out consumer behind the subscriber feed
//!
//! `TapPoint` is registered with the pipeline fan-out like any other
//! consumer. It provides:
//!
//! - Replay history for late joiners
//! - Per-subscriber filtering, sampling and rate limiting
//! - Session events forwarded to every subscriber
//! - Automatic cleanup of disconnected subscribers
//!
//! # Usage
//!
//! ```ignore
//! let tap_point = Arc::new(TapPoint::new());
//! pipeline.consumers().register(tap_point.clone());
//!
//! // For new connections:
//! let subscription = tap_point.subscribe(&request)?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use sift_protocol::{Consumer, ConsumerError, PacketRecord, RecordBatch, SessionEvent};

use crate::SubscribeRequest;
use crate::buffer::{DEFAULT_REPLAY_CAPACITY, ReplayBuffer};
use crate::error::Result;
use crate::filter::TapFilter;
use crate::subscriber::{SubscriberManager, TapItem};

/// Interval for rate limit counter reset
const RATE_LIMIT_RESET_INTERVAL: Duration = Duration::from_secs(1);

/// Interval for cleanup of disconnected subscribers
const CLEANUP_INTERVAL: Duration = Duration::from_secs(5);

/// A new subscriber's history and live stream
#[derive(Debug)]
pub struct Subscription {
    pub id: u64,
    /// Buffered records matching the subscriber's filter, oldest first
    pub history: Vec<PacketRecord>,
    pub receiver: mpsc::Receiver<TapItem>,
}

/// The broadcast point for the subscriber feed
#[derive(Debug)]
pub struct TapPoint {
    subscribers: SubscriberManager,
    /// Held across buffering and broadcast so history and live never overlap
    replay: Mutex<ReplayBuffer>,
    tapped_batches: AtomicU64,
    tapped_records: AtomicU64,
    sent_count: AtomicU64,
}

impl TapPoint {
    pub fn new() -> Self {
        Self::with_subscribers(DEFAULT_REPLAY_CAPACITY, SubscriberManager::new())
    }

    pub fn with_replay_capacity(capacity: usize) -> Self {
        Self::with_subscribers(capacity, SubscriberManager::new())
    }

    pub fn with_subscribers(replay_capacity: usize, subscribers: SubscriberManager) -> Self {
        Self {
            subscribers,
            replay: Mutex::new(ReplayBuffer::with_capacity(replay_capacity)),
            tapped_batches: AtomicU64::new(0),
            tapped_records: AtomicU64::new(0),
            sent_count: AtomicU64::new(0),
        }
    }

    /// Buffer a batch and offer it to every subscriber
    pub fn tap(&self, batch: &RecordBatch) {
        if batch.is_empty() {
            return;
        }
        self.tapped_batches.fetch_add(1, Ordering::Relaxed);
        self.tapped_records
            .fetch_add(batch.len() as u64, Ordering::Relaxed);

        let mut replay = self.replay.lock();
        replay.extend(batch.iter());

        if !self.subscribers.has_subscribers() {
            return;
        }
        let sent = self.subscribers.broadcast(batch);
        drop(replay);

        if sent > 0 {
            self.sent_count.fetch_add(sent as u64, Ordering::Relaxed);
            trace!(sent, records = batch.len(), "tapped batch to subscribers");
        }
    }

    /// Forward a session event; a new capture or a clear empties the history
    pub fn event(&self, event: SessionEvent) {
        let mut replay = self.replay.lock();
        if matches!(event, SessionEvent::CaptureStarted | SessionEvent::DataCleared) {
            replay.clear();
        }
        self.subscribers.broadcast_event(event);
    }

    /// Register a subscriber and take its replay history
    pub fn subscribe(&self, request: &SubscribeRequest) -> Result<Subscription> {
        let replay = self.replay.lock();
        let (id, receiver) = self.subscribers.subscribe(request)?;

        let filter = TapFilter::from_subscribe(request);
        let history: Vec<PacketRecord> = replay
            .last_n(request.last_n)
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        drop(replay);

        debug!(id, history = history.len(), "new tap subscriber");
        Ok(Subscription {
            id,
            history,
            receiver,
        })
    }

    pub fn unsubscribe(&self, id: u64) -> Result<()> {
        self.subscribers.unsubscribe(id)?;
        debug!(id, "tap subscriber removed");
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.count()
    }

    #[inline]
    pub fn has_subscribers(&self) -> bool {
        self.subscribers.has_subscribers()
    }

    pub fn stats(&self) -> TapStats {
        TapStats {
            tapped_batches: self.tapped_batches.load(Ordering::Relaxed),
            tapped_records: self.tapped_records.load(Ordering::Relaxed),
            sent_count: self.sent_count.load(Ordering::Relaxed),
            dropped: self.subscribers.dropped(),
            subscriber_count: self.subscribers.count(),
            replay_len: self.replay.lock().len(),
        }
    }

    /// Clean up disconnected subscribers
    pub fn cleanup(&self) -> usize {
        let removed = self.subscribers.cleanup_disconnected();
        if removed > 0 {
            debug!(removed, "cleaned up disconnected subscribers");
        }
        removed
    }

    pub fn reset_rate_counters(&self) {
        self.subscribers.reset_rate_counters();
    }

    /// Spawn the maintenance task
    ///
    /// Resets rate limit counters every second and removes disconnected
    /// subscribers every 5 seconds, until `shutdown` is cancelled.
    pub fn spawn_maintenance(
        self: &Arc<Self>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let tap_point = Arc::clone(self);

        tokio::spawn(async move {
            let mut rate_limit_interval = tokio::time::interval(RATE_LIMIT_RESET_INTERVAL);
            let mut cleanup_interval = tokio::time::interval(CLEANUP_INTERVAL);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = rate_limit_interval.tick() => {
                        tap_point.reset_rate_counters();
                    }
                    _ = cleanup_interval.tick() => {
                        tap_point.cleanup();
                    }
                }
            }
        })
    }
}

impl Default for TapPoint {
    fn default() -> Self {
        Self::new()
    }
}

impl Consumer for TapPoint {
    fn name(&self) -> &str {
        "tap"
    }

    fn deliver(&self, batch: &RecordBatch) -> std::result::Result<(), ConsumerError> {
        self.tap(batch);
        Ok(())
    }

    fn notify(&self, event: SessionEvent) -> std::result::Result<(), ConsumerError> {
        self.event(event);
        Ok(())
    }
}

/// Statistics about the tap point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapStats {
    pub tapped_batches: u64,
    pub tapped_records: u64,
    /// Batches queued to subscribers
    pub sent_count: u64,
    /// Items dropped on full subscriber channels
    pub dropped: u64,
    pub subscriber_count: usize,
    pub replay_len: usize,
}

#[cfg(test)]
#[path = "tap_point_test.rs"]
mod tests;
