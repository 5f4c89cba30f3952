//! Export - CSV and JSON copies of the accumulated records
//!
//! Files are named `<prefix>_<sanitized source>_<YYYYmmdd_HHMMSS>.{csv,json}`.
//! When an earlier export already holds that name, `_1`, `_2`, ... is appended
//! so exports within the same second never replace each other.
//! The CSV header is the serialized record field names; the JSON document is
//! the same `{"packets": [...]}` shape as the snapshot artifact, so an export
//! can be loaded back with [`crate::snapshot::load_records`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::info;

use sift_protocol::{PacketRecord, SourceId};

use crate::common::{Result, SinkError};
use crate::snapshot::PacketsDocument;
use crate::util::{pretty_json, write_atomic};

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;

/// Timestamp suffix of export file names
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Output formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    #[default]
    Both,
}

impl ExportFormat {
    fn csv(self) -> bool {
        matches!(self, Self::Csv | Self::Both)
    }

    fn json(self) -> bool {
        matches!(self, Self::Json | Self::Both)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Both => "both",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "both" => Ok(Self::Both),
            other => Err(SinkError::config(format!(
                "unknown export format '{other}' (expected csv, json or both)"
            ))),
        }
    }
}

/// Export destination and naming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub dir: PathBuf,
    pub prefix: String,
    pub format: ExportFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("exports"),
            prefix: "packets".into(),
            format: ExportFormat::Both,
        }
    }
}

/// Files produced by one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub paths: Vec<PathBuf>,
    pub records: usize,
}

/// Writes export files
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    config: ExportConfig,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export `records` captured from `source`, stamped with the current time
    pub fn export(&self, records: &[PacketRecord], source: &SourceId) -> Result<ExportReport> {
        self.export_with(records, source, self.config.format, Local::now())
    }

    /// Export with an explicit format and timestamp
    pub fn export_with(
        &self,
        records: &[PacketRecord],
        source: &SourceId,
        format: ExportFormat,
        at: DateTime<Local>,
    ) -> Result<ExportReport> {
        fs::create_dir_all(&self.config.dir).map_err(|e| SinkError::write(&self.config.dir, e))?;

        let stem = free_stem(
            &self.config.dir,
            file_stem(&self.config.prefix, source, at),
            format,
        );
        let mut paths = Vec::with_capacity(2);

        if format.csv() {
            let path = self.config.dir.join(format!("{stem}.csv"));
            write_csv(&path, records)?;
            paths.push(path);
        }
        if format.json() {
            let path = self.config.dir.join(format!("{stem}.json"));
            write_json(&path, records)?;
            paths.push(path);
        }

        info!(
            source = %source,
            records = records.len(),
            format = %format,
            dir = %self.config.dir.display(),
            "records exported"
        );

        Ok(ExportReport {
            paths,
            records: records.len(),
        })
    }
}

/// `<prefix>_<sanitized source>_<YYYYmmdd_HHMMSS>`
pub fn file_stem(prefix: &str, source: &SourceId, at: DateTime<Local>) -> String {
    format!("{prefix}_{}_{}", source.sanitized(), at.format(STAMP_FORMAT))
}

/// `stem`, or `stem_N` for the lowest N whose files `format` writes are all free
fn free_stem(dir: &Path, stem: String, format: ExportFormat) -> String {
    let taken = |candidate: &str| {
        (format.csv() && dir.join(format!("{candidate}.csv")).exists())
            || (format.json() && dir.join(format!("{candidate}.json")).exists())
    };
    if !taken(&stem) {
        return stem;
    }
    (1u32..)
        .map(|n| format!("{stem}_{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(stem)
}

/// Write records as CSV with a header row
pub fn write_csv(path: &Path, records: &[PacketRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if records.is_empty() {
        writer.write_record(CSV_HEADER)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| SinkError::write(path, e.into_error()))?;
    write_atomic(path, &bytes)
}

/// Write records as `{"packets": [...]}`
pub fn write_json(path: &Path, records: &[PacketRecord]) -> Result<()> {
    let bytes = pretty_json(&PacketsDocument { packets: records })?;
    write_atomic(path, &bytes)
}

/// Serialized record field names, for a header without rows
const CSV_HEADER: [&str; 8] = [
    "timestamp", "src_ip", "dst_ip", "protocol", "src_port", "dst_port", "size", "payload",
];
