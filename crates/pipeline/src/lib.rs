//! Sift - Pipeline
//!
//! Moves packets from a capture source to consumers, one session at a time.
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────── ControlPlane (start/stop/pause/filter) ───────────┐
//!                  ▼                                                               │
//! CaptureSource ──► Worker ──► classify ──► DistributionChannel ──► FanOut ──┬──► TUI scroll buffer
//!   (thread)        (thread)      │            (bounded FIFO)       (thread) ├──► stdout
//!                                 ▼                                          └──► tap subscribers
//!                           Accumulation ──► SnapshotStore (JSON artifacts)
//! ```
//!
//! # Key Design
//!
//! - **One worker per session**: polls its source with a timeout so stop is
//!   observed within one poll interval, and always flushes and closes on exit
//! - **Channel outlives sessions**: the fan-out keeps running across restarts
//! - **Explicit overflow**: a full channel drops the newest record or blocks
//!   the worker, per [`OverflowPolicy`]; drops are counted and rate-logged
//! - **Isolated consumers**: one failing or panicking consumer never starves
//!   the others
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sift_pipeline::PipelineBuilder;
//! use sift_sources::TsharkFactory;
//!
//! let mut pipeline = PipelineBuilder::new(Arc::new(TsharkFactory::default()))
//!     .consumer(scroll.clone())
//!     .build()?;
//!
//! pipeline.control_mut().start("eth0", "tcp")?;
//! ```

mod builder;
mod channel;
mod control;
mod error;
mod fanout;
mod metrics;
mod worker;

pub use builder::{DEFAULT_CHANNEL_CAPACITY, Pipeline, PipelineBuilder, PipelineSettings};
pub use channel::{DistributionChannel, OverflowPolicy, PushOutcome};
pub use control::{
    ControlParts, ControlPlane, DEFAULT_STOP_TIMEOUT, SessionSettings, SessionSnapshot,
    SessionState, SessionStatus,
};
pub use error::{ControlError, Result};
pub use fanout::{Backlog, ConsumerSet, FanOut, FanOutSettings};
pub use metrics::{
    BackpressureTracker, FanOutMetrics, FanOutSnapshot, MetricsSnapshot, PipelineMetrics,
};
pub use worker::{
    DEFAULT_FLUSH_EVERY, DEFAULT_POLL_INTERVAL, ExitReason, WorkerContext, WorkerHandle,
    WorkerSettings,
};
