//! Sift - Real-time packet triage
//!
//! # Usage
//!
//! ```bash
//! # Capture live traffic in the scrolling view
//! sift capture -i eth0 --filter "tcp or dns"
//!
//! # Replay an exported EK file as plain colored lines
//! sift replay capture.ndjson --plain
//!
//! # Follow the subscriber feed of a running session
//! sift tail --protocol DNS
//!
//! # Export a snapshot to CSV and JSON
//! sift export captured_packets.json
//! ```

mod cmd;
mod tui;

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sift_config::{Config, LogConfig, LogFormat, LogLevel, LogOutput};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Sift - Real-time packet triage
#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true, env = "SIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture live traffic from an interface
    Capture(cmd::capture::CaptureArgs),

    /// Replay a newline-delimited EK JSON file
    Replay(cmd::replay::ReplayArgs),

    /// Stream records from a running session's subscriber feed (Unix only)
    #[cfg(unix)]
    Tail(cmd::tail::TailArgs),

    /// Export a snapshot file to CSV and/or JSON
    Export(cmd::export::ExportArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration".to_string(),
    })?;
    let level = resolve_log_level(cli.log_level.as_deref(), &config)?;

    match cli.command {
        Command::Capture(args) => {
            // The scrolling view owns the terminal; it only logs to a file
            init_logging(&config.log, level, !args.session.plain)?;
            cmd::capture::run(args, config).await
        }
        Command::Replay(args) => {
            init_logging(&config.log, level, !args.session.plain)?;
            cmd::replay::run(args, config).await
        }
        #[cfg(unix)]
        Command::Tail(args) => {
            // Tail initializes its own logging
            cmd::tail::run(args, config).await
        }
        Command::Export(args) => {
            init_logging(&config.log, level, false)?;
            cmd::export::run(args, config)
        }
    }
}

/// Resolve log level: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, config: &Config) -> Result<LogLevel> {
    match cli_level {
        Some(level) => Ok(level.parse()?),
        None => Ok(config.log.level),
    }
}

/// Initialize the tracing subscriber for logging
///
/// With `terminal_owned` set, nothing is installed unless the configured
/// destination is a file.
fn init_logging(config: &LogConfig, level: LogLevel, terminal_owned: bool) -> Result<()> {
    if terminal_owned && !config.output.is_file() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let (writer, ansi) = match &config.output {
        LogOutput::Stdout => (
            BoxMakeWriter::new(io::stdout),
            atty::is(atty::Stream::Stdout),
        ),
        LogOutput::Stderr => (
            BoxMakeWriter::new(io::stderr),
            atty::is(atty::Stream::Stderr),
        ),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {path}"))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Console => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer).with_target(true))
            .try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install logger: {}", e))
}
