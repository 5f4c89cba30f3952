//! Feed subscribers and their delivery queues
//!
//! Every connection owns a bounded queue. Batches pass the connection's
//! filter, then its throttle, then a non-blocking send; a full queue drops
//! the batch for that connection alone so the fan-out never waits on a
//! slow reader.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use sift_protocol::{RecordBatch, SessionEvent};

use crate::SubscribeRequest;
use crate::error::{Result, TapError};
use crate::filter::TapFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Default maximum number of concurrent subscribers
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 100;

/// Default queue depth per subscriber
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// What a subscriber receives
#[derive(Debug, Clone, PartialEq)]
pub enum TapItem {
    /// Records that passed the subscriber's filter
    Packets(RecordBatch),
    /// A session event (never filtered or sampled)
    Event(SessionEvent),
}

/// Sampling and per-second batch cap for one subscriber
#[derive(Debug)]
struct Throttle {
    sample_rate: Option<f32>,
    per_second: Option<u32>,
    /// Batches admitted since the last window reset
    admitted: AtomicU32,
}

impl Throttle {
    fn new(sample_rate: Option<f32>, per_second: Option<u32>) -> Self {
        Self {
            sample_rate,
            per_second,
            admitted: AtomicU32::new(0),
        }
    }

    fn sampled(&self) -> bool {
        match self.sample_rate {
            None => true,
            Some(rate) if rate >= 1.0 => true,
            Some(rate) if rate <= 0.0 => false,
            Some(rate) => rand::random::<f32>() < rate,
        }
    }

    /// Whether one more batch fits in the current window
    fn admit(&self) -> bool {
        if !self.sampled() {
            return false;
        }
        let Some(cap) = self.per_second else {
            return true;
        };
        self.admitted
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                (n < cap).then_some(n + 1)
            })
            .is_ok()
    }

    fn new_window(&self) {
        self.admitted.store(0, Ordering::Relaxed);
    }
}

/// One connected feed client
#[derive(Debug)]
pub struct Subscriber {
    id: u64,
    filter: TapFilter,
    throttle: Throttle,
    tx: mpsc::Sender<TapItem>,
    /// Items lost to a full queue
    dropped: AtomicU64,
}

impl Subscriber {
    fn new(request: &SubscribeRequest, tx: mpsc::Sender<TapItem>) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            filter: TapFilter::from_subscribe(request),
            throttle: Throttle::new(request.sample_rate, request.max_batches_per_sec),
            tx,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn filter(&self) -> &TapFilter {
        &self.filter
    }

    /// Queue the part of `batch` this subscriber wants; true if queued
    pub fn offer(&self, batch: &RecordBatch) -> bool {
        match self.filter.apply(batch) {
            Some(wanted) if self.throttle.admit() => self.push(TapItem::Packets(wanted)),
            _ => false,
        }
    }

    /// Queue without waiting; a full queue counts a drop
    pub fn push(&self, item: TapItem) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// False once the connection task has dropped its receiver
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// The set of live subscribers, keyed by id
#[derive(Debug)]
pub struct SubscriberManager {
    subscribers: RwLock<BTreeMap<u64, Arc<Subscriber>>>,
    max_subscribers: usize,
    buffer_size: usize,
}

impl SubscriberManager {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_SUBSCRIBERS, DEFAULT_SUBSCRIBER_BUFFER)
    }

    pub fn with_limits(max_subscribers: usize, buffer_size: usize) -> Self {
        Self {
            subscribers: RwLock::new(BTreeMap::new()),
            max_subscribers,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Add a subscriber for `request`; returns its id and queue
    pub fn subscribe(&self, request: &SubscribeRequest) -> Result<(u64, mpsc::Receiver<TapItem>)> {
        let mut subscribers = self.subscribers.write();
        if subscribers.len() >= self.max_subscribers {
            return Err(TapError::MaxSubscribers {
                max: self.max_subscribers,
            });
        }

        let (tx, rx) = mpsc::channel(self.buffer_size);
        let subscriber = Subscriber::new(request, tx);
        let id = subscriber.id();
        subscribers.insert(id, Arc::new(subscriber));
        Ok((id, rx))
    }

    pub fn unsubscribe(&self, id: u64) -> Result<()> {
        self.subscribers
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(TapError::SubscriberNotFound { id })
    }

    /// The subscriber's filter, if it is registered
    pub fn filter_of(&self, id: u64) -> Option<TapFilter> {
        self.subscribers.read().get(&id).map(|s| s.filter().clone())
    }

    pub fn count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.read().is_empty()
    }

    /// Offer a batch to every subscriber; returns how many queued it
    pub fn broadcast(&self, batch: &RecordBatch) -> usize {
        self.subscribers
            .read()
            .values()
            .filter(|s| s.offer(batch))
            .count()
    }

    /// Send a session event to every subscriber
    pub fn broadcast_event(&self, event: SessionEvent) -> usize {
        self.subscribers
            .read()
            .values()
            .filter(|s| s.push(TapItem::Event(event)))
            .count()
    }

    /// Items dropped across all current subscribers
    pub fn dropped(&self) -> u64 {
        self.subscribers.read().values().map(|s| s.dropped()).sum()
    }

    /// Forget subscribers whose connection has gone; returns how many
    pub fn cleanup_disconnected(&self) -> usize {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|_, s| s.is_connected());
        before - subscribers.len()
    }

    /// Start a new rate-limit window for everyone
    pub fn reset_rate_counters(&self) {
        for subscriber in self.subscribers.read().values() {
            subscriber.throttle.new_window();
        }
    }
}

impl Default for SubscriberManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "subscriber_test.rs"]
mod tests;
