//! Distribution fan-out
//!
//! One OS thread drains the distribution channel in batches and hands each
//! batch, by value, to every registered consumer. The loop paces itself on
//! how much it found:
//!
//! | batch size | next drain after |
//! |------------|------------------|
//! | >= `busy_threshold` | `busy_delay` (50 ms) |
//! | 1 .. `busy_threshold` | `partial_delay` (200 ms) |
//! | empty | `idle_delay` (300 ms) |
//!
//! A consumer that errors or panics is logged and skipped for that batch;
//! the others still receive it. On shutdown the thread drains what is left.
//!
//! Session events and batches take turns: a batch is drained and delivered
//! under the same lock an event is announced under, so every consumer sees
//! the records queued before an event ahead of it and none of them after.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use sift_protocol::{Consumer, RecordBatch, SessionEvent};

use crate::channel::DistributionChannel;
use crate::error::{ControlError, Result};
use crate::metrics::FanOutMetrics;

#[cfg(test)]
#[path = "fanout_test.rs"]
mod tests;

/// Fan-out batching and pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanOutSettings {
    pub batch_size: usize,
    pub busy_threshold: usize,
    pub busy_delay: Duration,
    pub partial_delay: Duration,
    pub idle_delay: Duration,
}

impl Default for FanOutSettings {
    fn default() -> Self {
        Self {
            batch_size: 50,
            busy_threshold: 10,
            busy_delay: Duration::from_millis(50),
            partial_delay: Duration::from_millis(200),
            idle_delay: Duration::from_millis(300),
        }
    }
}

impl FanOutSettings {
    /// Delay before the next drain after finding `found` records
    pub fn delay_for(&self, found: usize) -> Duration {
        if found == 0 {
            self.idle_delay
        } else if found >= self.busy_threshold {
            self.busy_delay
        } else {
            self.partial_delay
        }
    }
}

/// Largest batch handed out while flushing ahead of an event
const FLUSH_BATCH: usize = 500;

/// What an announced event does with records still queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backlog {
    /// Deliver them ahead of the event
    Deliver,
    /// Drop them unseen
    Discard,
}

// =============================================================================
// Consumer registry
// =============================================================================

/// Registered consumers, shared by the fan-out thread and the control plane
#[derive(Default)]
pub struct ConsumerSet {
    consumers: RwLock<Vec<Arc<dyn Consumer>>>,
    /// Held from drain to last delivery, and while an event is announced
    turn: Mutex<()>,
    metrics: Arc<FanOutMetrics>,
}

impl ConsumerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a consumer; it receives batches drained from now on
    pub fn register(&self, consumer: Arc<dyn Consumer>) {
        debug!(consumer = consumer.name(), "consumer registered");
        self.consumers.write().push(consumer);
    }

    /// Remove every consumer named `name`; returns whether any was removed
    pub fn unregister(&self, name: &str) -> bool {
        let mut consumers = self.consumers.write();
        let before = consumers.len();
        consumers.retain(|c| c.name() != name);
        before != consumers.len()
    }

    pub fn len(&self) -> usize {
        self.consumers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.consumers
            .read()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn metrics(&self) -> &Arc<FanOutMetrics> {
        &self.metrics
    }

    /// Hand `batch` to every consumer, isolating failures
    pub fn deliver(&self, batch: &RecordBatch) {
        self.metrics.record_batch(batch.len() as u64);
        for consumer in self.snapshot() {
            match panic::catch_unwind(AssertUnwindSafe(|| consumer.deliver(batch))) {
                Ok(Ok(())) => self.metrics.record_delivery(),
                Ok(Err(e)) => {
                    self.metrics.record_consumer_error();
                    warn!(consumer = consumer.name(), error = %e, "consumer rejected batch");
                }
                Err(_) => {
                    self.metrics.record_consumer_error();
                    error!(consumer = consumer.name(), "consumer panicked on batch");
                }
            }
        }
    }

    /// Deliver a session event to every consumer, isolating failures
    pub fn notify(&self, event: SessionEvent) {
        self.metrics.record_event();
        for consumer in self.snapshot() {
            match panic::catch_unwind(AssertUnwindSafe(|| consumer.notify(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.metrics.record_consumer_error();
                    warn!(consumer = consumer.name(), event = event.as_str(), error = %e, "consumer rejected event");
                }
                Err(_) => {
                    self.metrics.record_consumer_error();
                    error!(consumer = consumer.name(), event = event.as_str(), "consumer panicked on event");
                }
            }
        }
    }

    /// Drain up to `max` records and deliver them; returns how many
    pub fn pump(&self, channel: &DistributionChannel, max: usize) -> usize {
        let _turn = self.turn.lock();
        let batch = channel.drain(max);
        let found = batch.len();
        if found > 0 {
            self.deliver(&RecordBatch::from(batch));
        }
        found
    }

    /// Settle the queued records per `backlog`, then notify `event`
    ///
    /// Returns how many queued records were delivered or discarded.
    pub fn announce(
        &self,
        channel: &DistributionChannel,
        backlog: Backlog,
        event: SessionEvent,
    ) -> usize {
        let _turn = self.turn.lock();
        let settled = match backlog {
            Backlog::Discard => channel.clear(),
            Backlog::Deliver => {
                let mut delivered = 0;
                loop {
                    let batch = channel.drain(FLUSH_BATCH);
                    if batch.is_empty() {
                        break delivered;
                    }
                    delivered += batch.len();
                    self.deliver(&RecordBatch::from(batch));
                }
            }
        };
        self.notify(event);
        settled
    }

    /// Clone of the current list so delivery never holds the lock
    fn snapshot(&self) -> Vec<Arc<dyn Consumer>> {
        self.consumers.read().clone()
    }
}

impl std::fmt::Debug for ConsumerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerSet")
            .field("consumers", &self.names())
            .finish()
    }
}

// =============================================================================
// Fan-out thread
// =============================================================================

/// The running fan-out thread
#[derive(Debug)]
pub struct FanOut {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl FanOut {
    /// Start draining `channel` into `consumers`
    pub fn spawn(
        channel: Arc<DistributionChannel>,
        consumers: Arc<ConsumerSet>,
        settings: FanOutSettings,
    ) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let thread = thread::Builder::new()
            .name("sift-fanout".into())
            .spawn(move || run(&channel, &consumers, settings, &flag))
            .map_err(|source| ControlError::Spawn {
                name: "fan-out",
                source,
            })?;
        Ok(Self {
            shutdown,
            thread: Some(thread),
        })
    }

    /// Stop the thread after it delivers whatever is still queued
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.shutdown.store(true, Ordering::Release);
        thread.thread().unpark();
        if thread.join().is_err() {
            error!("fan-out thread panicked");
        }
    }
}

impl Drop for FanOut {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    channel: &DistributionChannel,
    consumers: &ConsumerSet,
    settings: FanOutSettings,
    shutdown: &AtomicBool,
) {
    let batch_size = settings.batch_size.max(1);
    info!(batch_size, consumers = consumers.len(), "fan-out started");

    while !shutdown.load(Ordering::Acquire) {
        let found = consumers.pump(channel, batch_size);
        thread::park_timeout(settings.delay_for(found));
    }

    let mut remaining = 0usize;
    loop {
        let found = consumers.pump(channel, batch_size);
        if found == 0 {
            break;
        }
        remaining += found;
    }
    info!(drained = remaining, "fan-out stopped");
}
