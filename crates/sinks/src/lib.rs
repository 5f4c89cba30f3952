//! Sift - Sinks
//!
//! Everything that turns records into something a person or a tool reads.
//!
//! # Architecture
//!
//! The ingestion worker owns the session's [`Accumulation`] and flushes it to
//! the [`SnapshotStore`] every few records. Display sinks are fan-out
//! consumers and receive `Arc<[PacketRecord]>` batches.
//!
//! ```text
//! [Worker] --append--> [Accumulation] --flush--> [SnapshotStore] --> captured_packets.json
//!                            |                                      data_usage.json
//!                            +--export--> [Exporter] --> <prefix>_<source>_<stamp>.{csv,json}
//!
//! [Fan-out] --Arc<[PacketRecord]>--> [ScrollBuffer] / [StdoutSink]
//! ```
//!
//! # Available Sinks
//!
//! | Sink | Purpose |
//! |------|---------|
//! | `snapshot` | Periodic whole-file session snapshot |
//! | `export` | On-demand CSV / JSON copies |
//! | `scroll` | Bounded history behind the terminal UI |
//! | `stdout` | Plain colored line output |

// =============================================================================
// Sink implementations (each in its own submodule)
// =============================================================================

/// Snapshot store and the session accumulation it flushes
pub mod snapshot;

/// CSV / JSON export
pub mod export;

/// Scroll buffer consumer and viewport
pub mod scroll;

/// Stdout sink - human-readable line output
pub mod stdout;

// =============================================================================
// Shared utilities
// =============================================================================

/// Atomic artifact writes and rate-limited logging
pub mod util;

/// Common types shared by all sinks (errors, metrics)
mod common;

// =============================================================================
// Public re-exports
// =============================================================================

pub use common::{MetricsSnapshot, Result, SinkError, StoreMetrics};

pub use export::{ExportConfig, ExportFormat, ExportReport, Exporter};
pub use scroll::{DEFAULT_SCROLL_CAPACITY, ScrollBuffer, Viewport};
pub use snapshot::{
    Accumulation, PACKETS_FILE, PacketsDocument, SharedAccumulation, SnapshotConfig,
    SnapshotStore, USAGE_FILE, load_records, load_usage,
};
pub use stdout::{StdoutConfig, StdoutSink};
