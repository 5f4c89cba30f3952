//! Snapshot Store - periodic on-disk view of the current session
//!
//! The ingestion worker appends every record to an [`Accumulation`] and
//! periodically asks the [`SnapshotStore`] to rewrite two artifacts from it:
//!
//! ```text
//! captured_packets.json   {"packets": [PacketRecord, ...]}
//! data_usage.json         [{"timestamp": "12:00:01", "data_usage": "1500"}, ...]
//! ```
//!
//! Both are rewritten wholesale (temp file + rename) and pretty printed with
//! 4-space indentation. Flushing twice without new records yields
//! byte-identical files. Flush failures are logged rate-limited and retried
//! at the next scheduled flush; they never abort ingestion.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sift_protocol::{PacketRecord, UsageBucket, UsageTable};

use crate::common::{Result, SinkError, StoreMetrics};
use crate::util::{RateLimitedLogger, pretty_json, write_atomic};

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod tests;

/// Default packets artifact name
pub const PACKETS_FILE: &str = "captured_packets.json";

/// Default usage artifact name
pub const USAGE_FILE: &str = "data_usage.json";

/// `{"packets": [...]}` document shape, shared with the JSON export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketsDocument<T> {
    pub packets: T,
}

// =============================================================================
// Accumulation
// =============================================================================

/// Records and usage accumulated by the current session
///
/// Retention is bounded by `max_records` (oldest evicted first, `0` keeps
/// everything). Usage buckets count every appended record, evicted or not.
#[derive(Debug, Clone, Default)]
pub struct Accumulation {
    records: VecDeque<PacketRecord>,
    usage: UsageTable,
    max_records: usize,
    appended: u64,
    evicted: u64,
}

/// Accumulation shared between the worker and the control plane
pub type SharedAccumulation = Arc<RwLock<Accumulation>>;

impl Accumulation {
    /// Create an empty accumulation retaining at most `max_records`
    pub fn new(max_records: usize) -> Self {
        Self {
            max_records,
            ..Self::default()
        }
    }

    /// Create a shared, empty accumulation
    pub fn shared(max_records: usize) -> SharedAccumulation {
        Arc::new(RwLock::new(Self::new(max_records)))
    }

    /// Append a record and bump its usage bucket
    pub fn push(&mut self, record: PacketRecord) {
        self.usage.add(&record.captured_at, record.size_bytes);
        if self.max_records > 0 && self.records.len() >= self.max_records {
            self.records.pop_front();
            self.evicted += 1;
        }
        self.records.push_back(record);
        self.appended += 1;
    }

    /// Retained records, oldest first
    pub fn records(&self) -> impl ExactSizeIterator<Item = &PacketRecord> {
        self.records.iter()
    }

    /// Retained records as an owned vector
    pub fn to_vec(&self) -> Vec<PacketRecord> {
        self.records.iter().cloned().collect()
    }

    /// The last `n` retained records, oldest first
    pub fn tail(&self, n: usize) -> Vec<PacketRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).cloned().collect()
    }

    /// Per-second usage
    #[inline]
    pub fn usage(&self) -> &UsageTable {
        &self.usage
    }

    /// Retained record count
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records appended since the last clear
    #[inline]
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Records evicted by the retention bound since the last clear
    #[inline]
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Retained record count per protocol tag, most frequent first
    pub fn protocol_counts(&self) -> Vec<(String, u64)> {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for record in &self.records {
            *counts.entry(record.protocol.as_str()).or_default() += 1;
        }
        let mut counts: Vec<(String, u64)> = counts
            .into_iter()
            .map(|(protocol, count)| (protocol.to_string(), count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    /// Discard records, usage and counters; retention bound is kept
    pub fn clear(&mut self) {
        self.records.clear();
        self.usage.clear();
        self.appended = 0;
        self.evicted = 0;
    }
}

// =============================================================================
// Snapshot Store
// =============================================================================

/// Where the snapshot artifacts live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    pub dir: PathBuf,
    pub packets_file: String,
    pub usage_file: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            packets_file: PACKETS_FILE.into(),
            usage_file: USAGE_FILE.into(),
        }
    }
}

impl SnapshotConfig {
    /// Default file names under `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }
}

/// Rewrites the snapshot artifacts
#[derive(Debug)]
pub struct SnapshotStore {
    packets_path: PathBuf,
    usage_path: PathBuf,
    metrics: Arc<StoreMetrics>,
    error_log: RateLimitedLogger,
}

impl SnapshotStore {
    /// Create the store, creating the artifact directory if needed
    pub fn open(config: &SnapshotConfig) -> Result<Self> {
        fs::create_dir_all(&config.dir).map_err(|e| SinkError::write(&config.dir, e))?;
        debug!(dir = %config.dir.display(), "snapshot store opened");
        Ok(Self {
            packets_path: config.dir.join(&config.packets_file),
            usage_path: config.dir.join(&config.usage_file),
            metrics: Arc::new(StoreMetrics::new()),
            error_log: RateLimitedLogger::default(),
        })
    }

    pub fn packets_path(&self) -> &Path {
        &self.packets_path
    }

    pub fn usage_path(&self) -> &Path {
        &self.usage_path
    }

    pub fn metrics(&self) -> &Arc<StoreMetrics> {
        &self.metrics
    }

    /// Rewrite both artifacts from `acc`
    pub fn flush(&self, acc: &Accumulation) -> Result<()> {
        let packets = pretty_json(&PacketsDocument {
            packets: &acc.records,
        })?;
        let usage = pretty_json(acc.usage.buckets())?;

        write_atomic(&self.packets_path, &packets)?;
        write_atomic(&self.usage_path, &usage)?;

        self.metrics
            .flushed(acc.len() as u64, (packets.len() + usage.len()) as u64);
        Ok(())
    }

    /// Flush, logging failures rate-limited; returns whether it succeeded
    pub fn flush_or_log(&self, acc: &Accumulation) -> bool {
        match self.flush(acc) {
            Ok(()) => true,
            Err(e) => {
                self.metrics.flush_failed();
                self.error_log.error("snapshot flush failed", &e);
                false
            }
        }
    }

    /// Rewrite both artifacts as empty shapes
    pub fn reset(&self) -> Result<()> {
        self.flush(&Accumulation::default())?;
        info!(path = %self.packets_path.display(), "snapshot reset");
        Ok(())
    }
}

/// Read the records of a `captured_packets.json` (or JSON export) file
pub fn load_records(path: &Path) -> Result<Vec<PacketRecord>> {
    let bytes = fs::read(path).map_err(|e| SinkError::read(path, e))?;
    let doc: PacketsDocument<Vec<PacketRecord>> = serde_json::from_slice(&bytes)?;
    Ok(doc.packets)
}

/// Read a `data_usage.json` file
pub fn load_usage(path: &Path) -> Result<UsageTable> {
    let bytes = fs::read(path).map_err(|e| SinkError::read(path, e))?;
    let buckets: Vec<UsageBucket> = serde_json::from_slice(&bytes)?;
    Ok(buckets.into_iter().collect())
}
