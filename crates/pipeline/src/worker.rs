//! Ingestion worker - one OS thread per capture session
//!
//! ```text
//! CaptureSource ──poll──► [stop?] ─► [paused? discard] ─► [filter] ─► Classifier
//!                                                                        │
//!                      DistributionChannel ◄── push ──┬──────────────────┘
//!                      Accumulation        ◄── append ┘  (flush every N)
//! ```
//!
//! The source is polled with a timeout so stop requests are observed even
//! while it is quiet. On every exit path, unwinding included, the session
//! guard flushes the snapshot once more and closes the source exactly once.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use sift_classify::{Classifier, DisplayFilter};
use sift_protocol::{DecodedPacket, SourceId};
use sift_sinks::{SharedAccumulation, SnapshotStore};
use sift_sources::{CaptureSource, Next};

use crate::channel::{DistributionChannel, PushOutcome};
use crate::metrics::{BackpressureTracker, PipelineMetrics};

#[cfg(test)]
#[path = "worker_test.rs"]
mod tests;

/// Default source poll timeout
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default number of records between snapshot flushes
pub const DEFAULT_FLUSH_EVERY: usize = 10;

/// Worker tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Longest a single source poll may wait
    pub poll_interval: Duration,
    /// Records between snapshot flushes (0 disables periodic flushes)
    pub flush_every: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            flush_every: DEFAULT_FLUSH_EVERY,
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The source reported exhaustion
    EndOfSource,
    /// A stop was requested
    Stopped,
    /// The source failed
    SourceError(String),
    /// The worker thread panicked
    Panicked,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndOfSource => f.write_str("end of source"),
            Self::Stopped => f.write_str("stopped"),
            Self::SourceError(msg) => write!(f, "source error: {msg}"),
            Self::Panicked => f.write_str("worker panicked"),
        }
    }
}

/// Everything a worker needs for one session
pub struct WorkerContext {
    pub source: Box<dyn CaptureSource>,
    /// Worker-side filter; `None` when the source filters natively or the
    /// filter matches everything
    pub filter: Option<DisplayFilter>,
    pub classifier: Arc<Classifier>,
    pub channel: Arc<DistributionChannel>,
    pub accumulation: SharedAccumulation,
    pub store: Option<Arc<SnapshotStore>>,
    pub cancel: CancellationToken,
    pub paused: Arc<AtomicBool>,
    pub metrics: Arc<PipelineMetrics>,
    pub backpressure: Arc<BackpressureTracker>,
    pub settings: WorkerSettings,
}

/// Handle to a running worker thread
#[derive(Debug)]
pub struct WorkerHandle {
    thread: Option<JoinHandle<ExitReason>>,
    done: Receiver<()>,
}

impl WorkerHandle {
    /// Whether the worker has finished (its guard has run)
    pub fn is_finished(&self) -> bool {
        matches!(
            self.done.try_recv(),
            Err(channel::TryRecvError::Disconnected)
        )
    }

    /// Wait up to `timeout` for the worker to finish
    ///
    /// Returns `None` on timeout; the thread is then left detached.
    pub fn wait(mut self, timeout: Duration) -> Option<ExitReason> {
        match self.done.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => None,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => Some(self.join()),
        }
    }

    fn join(&mut self) -> ExitReason {
        match self.thread.take().map(JoinHandle::join) {
            Some(Ok(reason)) => reason,
            Some(Err(_)) => ExitReason::Panicked,
            None => ExitReason::Stopped,
        }
    }
}

/// Spawn the worker thread for one session
pub fn spawn(ctx: WorkerContext) -> std::io::Result<WorkerHandle> {
    let (done_tx, done_rx) = channel::bounded::<()>(0);
    let thread = std::thread::Builder::new()
        .name("sift-worker".into())
        .spawn(move || run(ctx, done_tx))?;
    Ok(WorkerHandle {
        thread: Some(thread),
        done: done_rx,
    })
}

/// Flushes the snapshot and closes the source when dropped
struct SessionGuard {
    source: Box<dyn CaptureSource>,
    accumulation: SharedAccumulation,
    store: Option<Arc<SnapshotStore>>,
    metrics: Arc<PipelineMetrics>,
    _done: Sender<()>,
}

impl SessionGuard {
    fn flush(&self) {
        if let Some(store) = &self.store {
            let ok = store.flush_or_log(&self.accumulation.read());
            self.metrics.record_flush(ok);
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.flush();
        if let Err(e) = self.source.close() {
            warn!(source = %self.source.id(), error = %e, "failed to close capture source");
        }
        // _done drops after this, signalling completion
    }
}

struct Worker {
    guard: SessionGuard,
    filter: Option<DisplayFilter>,
    classifier: Arc<Classifier>,
    channel: Arc<DistributionChannel>,
    cancel: CancellationToken,
    paused: Arc<AtomicBool>,
    metrics: Arc<PipelineMetrics>,
    backpressure: Arc<BackpressureTracker>,
    settings: WorkerSettings,
    since_flush: usize,
}

fn run(ctx: WorkerContext, done: Sender<()>) -> ExitReason {
    let source_id = ctx.source.id().clone();
    let mut worker = Worker {
        guard: SessionGuard {
            source: ctx.source,
            accumulation: ctx.accumulation,
            store: ctx.store,
            metrics: Arc::clone(&ctx.metrics),
            _done: done,
        },
        filter: ctx.filter,
        classifier: ctx.classifier,
        channel: ctx.channel,
        cancel: ctx.cancel,
        paused: ctx.paused,
        metrics: ctx.metrics,
        backpressure: ctx.backpressure,
        settings: ctx.settings,
        since_flush: 0,
    };

    info!(source = %source_id, "ingestion worker started");

    let reason = match panic::catch_unwind(AssertUnwindSafe(|| worker.run_loop())) {
        Ok(reason) => reason,
        Err(_) => {
            error!(source = %source_id, "ingestion worker panicked");
            ExitReason::Panicked
        }
    };

    let records = worker.guard.accumulation.read().appended();
    drop(worker);

    log_exit(&source_id, &reason, records);
    reason
}

fn log_exit(source: &SourceId, reason: &ExitReason, records: u64) {
    match reason {
        ExitReason::SourceError(msg) => {
            error!(source = %source, error = %msg, records, "capture session failed");
        }
        _ => info!(source = %source, reason = %reason, records, "ingestion worker finished"),
    }
}

impl Worker {
    fn run_loop(&mut self) -> ExitReason {
        loop {
            if self.cancel.is_cancelled() {
                return ExitReason::Stopped;
            }

            let next = self.guard.source.next_packet(self.settings.poll_interval);
            match next {
                Ok(Next::Packet(packet)) => {
                    if self.cancel.is_cancelled() {
                        return ExitReason::Stopped;
                    }
                    if let Some(reason) = self.handle(&packet) {
                        return reason;
                    }
                }
                Ok(Next::Idle) => {}
                Ok(Next::End) => return ExitReason::EndOfSource,
                Err(e) => return ExitReason::SourceError(e.to_string()),
            }
        }
    }

    /// Process one packet; `Some` ends the session
    fn handle(&mut self, packet: &DecodedPacket) -> Option<ExitReason> {
        self.metrics.record_seen();

        if self.paused.load(Ordering::Acquire) {
            self.metrics.record_paused();
            return None;
        }

        if let Some(filter) = &self.filter
            && !filter.matches(packet)
        {
            self.metrics.record_filtered();
            return None;
        }

        let record = match self.classifier.classify(packet) {
            Ok(record) => record,
            Err(e) => {
                self.metrics.record_skipped();
                debug!(error = %e, protocol = %packet.highest_layer, "packet skipped");
                return None;
            }
        };
        self.metrics.record_classified();

        match self.channel.push(record.clone(), &self.cancel) {
            PushOutcome::Queued => {}
            PushOutcome::Dropped => {
                self.metrics.record_dropped();
                self.backpressure.record_drop();
            }
            PushOutcome::Cancelled => return Some(ExitReason::Stopped),
        }

        self.guard.accumulation.write().push(record);

        self.since_flush += 1;
        if self.settings.flush_every > 0 && self.since_flush >= self.settings.flush_every {
            self.since_flush = 0;
            self.guard.flush();
        }
        None
    }
}
