//! Control plane - owns the capture session
//!
//! ```text
//!            start                 pause
//!   Idle ───────────► Running ◄────────────► Paused
//!    ▲                  │        resume        │
//!    │      stop / end of source / error       │
//!    └──────────────────┴──────────────────────┘
//! ```
//!
//! The channel, the fan-out and the consumer registry outlive sessions; only
//! the worker, its signals and the accumulated history are per session.
//! Session events are announced through the consumer set, in line with the
//! queued records, so a consumer never sees one session's records after the
//! next session's `CaptureStarted`.
//! A worker that ends on its own (source exhausted or failed) is reaped to
//! `Idle` on the next control call and keeps its history readable for export
//! until the next `start`.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sift_classify::{Classifier, DisplayFilter};
use sift_protocol::{PacketRecord, SessionEvent, SourceId, UsageTable};
use sift_sinks::{
    ExportConfig, ExportFormat, ExportReport, Exporter, SharedAccumulation, SnapshotStore,
};
use sift_sources::SourceFactory;

use crate::channel::DistributionChannel;
use crate::error::{ControlError, Result};
use crate::fanout::{Backlog, ConsumerSet};
use crate::metrics::{BackpressureTracker, PipelineMetrics};
use crate::worker::{self, ExitReason, WorkerContext, WorkerHandle, WorkerSettings};

#[cfg(test)]
#[path = "control_test.rs"]
mod tests;

/// Default bound on how long `stop` waits for the worker
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Session-level settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub worker: WorkerSettings,
    pub stop_timeout: Duration,
    /// Discard queued records left over from the previous session on start
    pub drain_on_restart: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            worker: WorkerSettings::default(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            drain_on_restart: false,
        }
    }
}

/// Session state as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        })
    }
}

/// Read-only view of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub source: Option<SourceId>,
    pub filter: String,
    /// Records appended this session (monotonic)
    pub record_count: u64,
    /// Records currently retained
    pub retained: usize,
    /// Records the channel refused this session
    pub dropped: u64,
    pub last_exit: Option<ExitReason>,
}

/// Copy of the accumulated session data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub records: Vec<PacketRecord>,
    pub usage: UsageTable,
    pub protocol_counts: Vec<(String, u64)>,
}

struct ActiveSession {
    cancel: CancellationToken,
    paused: Arc<AtomicBool>,
    worker: WorkerHandle,
}

/// Starts, stops, pauses and reconfigures capture sessions
pub struct ControlPlane {
    factory: Arc<dyn SourceFactory>,
    classifier: Arc<Classifier>,
    channel: Arc<DistributionChannel>,
    consumers: Arc<ConsumerSet>,
    accumulation: SharedAccumulation,
    store: Option<Arc<SnapshotStore>>,
    exporter: Exporter,
    metrics: Arc<PipelineMetrics>,
    backpressure: Arc<BackpressureTracker>,
    settings: SessionSettings,

    active: Option<ActiveSession>,
    source: Option<SourceId>,
    filter: String,
    dropped_base: u64,
    last_exit: Option<ExitReason>,
}

/// Shared pipeline parts handed to the control plane
pub struct ControlParts {
    pub factory: Arc<dyn SourceFactory>,
    pub classifier: Arc<Classifier>,
    pub channel: Arc<DistributionChannel>,
    pub consumers: Arc<ConsumerSet>,
    pub accumulation: SharedAccumulation,
    pub store: Option<Arc<SnapshotStore>>,
    pub export: ExportConfig,
    pub settings: SessionSettings,
}

impl ControlPlane {
    pub fn new(parts: ControlParts) -> Self {
        Self {
            factory: parts.factory,
            classifier: parts.classifier,
            channel: parts.channel,
            consumers: parts.consumers,
            accumulation: parts.accumulation,
            store: parts.store,
            exporter: Exporter::new(parts.export),
            metrics: Arc::new(PipelineMetrics::new()),
            backpressure: Arc::new(BackpressureTracker::new()),
            settings: parts.settings,
            active: None,
            source: None,
            filter: String::new(),
            dropped_base: 0,
            last_exit: None,
        }
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Start a session on `source` with `filter` (blank = everything)
    pub fn start(&mut self, source: impl Into<SourceId>, filter: &str) -> Result<()> {
        self.reap();
        if self.active.is_some() {
            return Err(ControlError::AlreadyRunning);
        }

        let source = source.into();
        if source.is_empty() {
            return Err(ControlError::EmptySource);
        }

        let filter = filter.trim();
        let worker_filter = if self.factory.filters_natively() {
            None
        } else {
            Some(DisplayFilter::parse(filter)?).filter(|f| !f.is_match_all())
        };

        self.accumulation.write().clear();
        let capture = self.factory.open(&source, filter)?;

        // announced before the worker exists, so no new record can precede it
        let backlog = if self.settings.drain_on_restart {
            Backlog::Discard
        } else {
            Backlog::Deliver
        };
        let settled = self
            .consumers
            .announce(&self.channel, backlog, SessionEvent::CaptureStarted);
        if settled > 0 && backlog == Backlog::Discard {
            info!(discarded = settled, "discarded records queued by the previous session");
        }

        let cancel = CancellationToken::new();
        let paused = Arc::new(AtomicBool::new(false));
        let handle = worker::spawn(WorkerContext {
            source: capture,
            filter: worker_filter,
            classifier: Arc::clone(&self.classifier),
            channel: Arc::clone(&self.channel),
            accumulation: Arc::clone(&self.accumulation),
            store: self.store.clone(),
            cancel: cancel.clone(),
            paused: Arc::clone(&paused),
            metrics: Arc::clone(&self.metrics),
            backpressure: Arc::clone(&self.backpressure),
            settings: self.settings.worker,
        })
        .map_err(|source| {
            self.consumers
                .announce(&self.channel, Backlog::Deliver, SessionEvent::CaptureStopped);
            ControlError::Spawn {
                name: "worker",
                source,
            }
        })?;

        self.active = Some(ActiveSession {
            cancel,
            paused,
            worker: handle,
        });
        self.source = Some(source.clone());
        self.filter = filter.to_string();
        self.dropped_base = self.metrics.records_dropped();
        self.last_exit = None;

        info!(
            source = %source,
            filter = filter,
            adapter = self.factory.name(),
            "capture session started"
        );
        Ok(())
    }

    /// Stop the session, wait for the worker, discard its history
    pub fn stop(&mut self) -> Result<ExitReason> {
        self.reap();
        let session = self.active.take().ok_or(ControlError::NotRunning)?;

        session.cancel.cancel();
        let reason = match session.worker.wait(self.settings.stop_timeout) {
            Some(reason) => reason,
            None => {
                warn!(
                    timeout_ms = self.settings.stop_timeout.as_millis() as u64,
                    "worker did not stop in time, detaching it"
                );
                ExitReason::Stopped
            }
        };

        self.accumulation.write().clear();
        if let Some(store) = &self.store
            && let Err(e) = store.reset()
        {
            warn!(error = %e, "failed to reset snapshot");
        }

        info!(source = ?self.source.as_ref().map(SourceId::as_str), reason = %reason, "capture session stopped");
        self.last_exit = Some(reason.clone());
        self.backpressure.flush();
        self.consumers
            .announce(&self.channel, Backlog::Deliver, SessionEvent::CaptureStopped);
        Ok(reason)
    }

    /// Discard packets until `resume`; idempotent
    pub fn pause(&mut self) -> Result<()> {
        self.set_paused(true)
    }

    /// Stop discarding packets; idempotent
    pub fn resume(&mut self) -> Result<()> {
        self.set_paused(false)
    }

    fn set_paused(&mut self, paused: bool) -> Result<()> {
        self.reap();
        let session = self.active.as_ref().ok_or(ControlError::NotRunning)?;
        let was = session.paused.swap(paused, Ordering::AcqRel);
        if was != paused {
            info!(paused, "capture session {}", if paused { "paused" } else { "resumed" });
        }
        Ok(())
    }

    /// Restart on the same source with a new filter; history is discarded
    pub fn reconfigure_filter(&mut self, filter: &str) -> Result<()> {
        self.reap();
        let source = self.source.clone().ok_or(ControlError::NoSource)?;

        // reject a bad filter before tearing the running session down
        if !self.factory.filters_natively() {
            DisplayFilter::parse(filter)?;
        }

        if self.active.is_some() {
            self.stop()?;
        }
        self.start(source, filter)
    }

    /// Discard accumulated history and queued records without stopping
    pub fn clear(&mut self) {
        self.reap();
        self.accumulation.write().clear();
        if let Some(store) = &self.store
            && let Err(e) = store.reset()
        {
            warn!(error = %e, "failed to reset snapshot");
        }
        let discarded =
            self.consumers
                .announce(&self.channel, Backlog::Discard, SessionEvent::DataCleared);
        info!(discarded, "session data cleared");
    }

    /// Current state, counters and last exit reason
    pub fn status(&mut self) -> SessionStatus {
        self.reap();
        let state = match &self.active {
            None => SessionState::Idle,
            Some(s) if s.paused.load(Ordering::Acquire) => SessionState::Paused,
            Some(_) => SessionState::Running,
        };
        let acc = self.accumulation.read();
        SessionStatus {
            state,
            source: self.source.clone(),
            filter: self.filter.clone(),
            record_count: acc.appended(),
            retained: acc.len(),
            dropped: self.metrics.records_dropped().saturating_sub(self.dropped_base),
            last_exit: self.last_exit.clone(),
        }
    }

    /// Whether a session is active (running or paused)
    pub fn is_running(&mut self) -> bool {
        self.reap();
        self.active.is_some()
    }

    /// Copy of the accumulated records, usage and protocol counts
    pub fn snapshot(&self) -> SessionSnapshot {
        let acc = self.accumulation.read();
        SessionSnapshot {
            records: acc.to_vec(),
            usage: acc.usage().clone(),
            protocol_counts: acc.protocol_counts(),
        }
    }

    /// Export the accumulated records; `dir` overrides the configured one
    pub fn export(&mut self, format: ExportFormat, dir: Option<&Path>) -> Result<ExportReport> {
        self.reap();
        let source = self.source.clone().ok_or(ControlError::NoSource)?;
        let records = self.accumulation.read().to_vec();

        let report = match dir {
            Some(dir) => Exporter::new(ExportConfig {
                dir: dir.to_path_buf(),
                ..self.exporter.config().clone()
            })
            .export_with(&records, &source, format, Local::now())?,
            None => self
                .exporter
                .export_with(&records, &source, format, Local::now())?,
        };
        Ok(report)
    }

    /// Move a self-terminated session to `Idle`
    fn reap(&mut self) {
        let finished = self
            .active
            .as_ref()
            .is_some_and(|s| s.worker.is_finished());
        if !finished {
            return;
        }
        let Some(session) = self.active.take() else {
            return;
        };

        let reason = session
            .worker
            .wait(Duration::ZERO)
            .unwrap_or(ExitReason::EndOfSource);
        info!(reason = %reason, "capture session ended on its own");
        self.last_exit = Some(reason);
        self.backpressure.flush();
        self.consumers
            .announce(&self.channel, Backlog::Deliver, SessionEvent::CaptureStopped);
    }
}

impl Drop for ControlPlane {
    fn drop(&mut self) {
        if self.active.is_some() {
            let _ = self.stop();
        }
    }
}
