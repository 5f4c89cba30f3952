//! Error and metrics types shared by the snapshot store and the exporter

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

/// Result type for sink operations
pub type Result<T> = std::result::Result<T, SinkError>;

/// Counters for artifact rewrites
#[derive(Debug, Default)]
pub struct StoreMetrics {
    flushes: AtomicU64,
    failed_flushes: AtomicU64,
    /// Records contained in the most recent successful rewrite
    last_records: AtomicU64,
    bytes_written: AtomicU64,
}

impl StoreMetrics {
    pub const fn new() -> Self {
        Self {
            flushes: AtomicU64::new(0),
            failed_flushes: AtomicU64::new(0),
            last_records: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
        }
    }

    /// A rewrite of `records` records totalling `bytes` succeeded
    #[inline]
    pub fn flushed(&self, records: u64, bytes: u64) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.last_records.store(records, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn flush_failed(&self) {
        self.failed_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            flushes: self.flushes.load(Ordering::Relaxed),
            failed_flushes: self.failed_flushes.load(Ordering::Relaxed),
            last_records: self.last_records.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `StoreMetrics`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub flushes: u64,
    pub failed_flushes: u64,
    pub last_records: u64,
    pub bytes_written: u64,
}

/// Errors writing or reading session artifacts
#[derive(Debug, Error)]
pub enum SinkError {
    /// Failed to write an artifact
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read an artifact
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Rejected export or snapshot settings
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
