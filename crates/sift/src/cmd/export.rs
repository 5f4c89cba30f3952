//! Export command - turn a snapshot file into CSV and/or JSON exports
//!
//! Works on `captured_packets.json` (or any earlier JSON export), so a
//! finished or crashed session can still be exported after the fact.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use sift_config::Config;
use sift_protocol::SourceId;
use sift_sinks::{ExportFormat, ExportReport, Exporter, PACKETS_FILE, load_records};

use super::session::export_config;

/// Export command arguments
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Snapshot file, or a directory holding captured_packets.json
    pub snapshot: PathBuf,

    /// csv, json or both (overrides [export] format)
    #[arg(short, long)]
    pub format: Option<ExportFormat>,

    /// Output directory (overrides [export] dir)
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// File name prefix (overrides [export] prefix)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Source name used in the file names
    #[arg(long, default_value = "snapshot")]
    pub source: String,
}

/// Run the export command
pub fn run(args: ExportArgs, config: Config) -> Result<()> {
    match export(&args, &config)? {
        Some(report) => {
            for path in &report.paths {
                println!("{}", path.display());
            }
            eprintln!("exported {} records", report.records);
        }
        None => eprintln!("no records in {}, nothing exported", args.snapshot.display()),
    }
    Ok(())
}

/// Export the snapshot named by `args`; `None` when it holds no records
pub fn export(args: &ExportArgs, config: &Config) -> Result<Option<ExportReport>> {
    let path = snapshot_path(&args.snapshot);
    let records = load_records(&path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    if records.is_empty() {
        return Ok(None);
    }

    let mut export = export_config(config);
    if let Some(format) = args.format {
        export.format = format;
    }
    if let Some(ref dir) = args.out {
        export.dir = dir.clone();
    }
    if let Some(ref prefix) = args.prefix {
        export.prefix = prefix.clone();
    }

    let report = Exporter::new(export)
        .export(&records, &SourceId::new(args.source.as_str()))
        .context("export failed")?;
    Ok(Some(report))
}

fn snapshot_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(PACKETS_FILE)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
