//! Stdout Sink - Human-readable record output
//!
//! Prints each delivered record on one line, colored by protocol family.
//! Used by `sift capture --plain` and `sift tail`.
//!
//! # Example Output
//!
//! ```text
//! 07:34:59 DNS    192.168.1.10:53124   -> 8.8.8.8:53            74 Query, Name: example.com
//! 07:34:59 TCP    10.0.0.5:443         -> 10.0.0.9:51234        66 [ACK] seq=1 ack=1 win=501
//! 07:35:00 ARP    N/A                  -> N/A                   42 who-has, Sender: 10.0.0.1
//! ```

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use owo_colors::{OwoColorize, Style};
use parking_lot::Mutex;

use sift_protocol::{Consumer, ConsumerError, NO_PORT, PacketRecord, RecordBatch, SessionEvent};


/// Configuration for stdout sink
#[derive(Debug, Clone)]
pub struct StdoutConfig {
    /// Enable colored output
    pub color: bool,

    /// Show batch summary headers (default: false for cleaner output)
    pub show_batch_headers: bool,

    /// Maximum records to show per batch (0 = all)
    pub max_records: usize,
}

impl Default for StdoutConfig {
    fn default() -> Self {
        Self {
            color: true,
            show_batch_headers: false,
            max_records: 0,
        }
    }
}

impl StdoutConfig {
    /// Create config with colors disabled (for piped output)
    pub fn no_color() -> Self {
        Self {
            color: false,
            ..Self::default()
        }
    }

    /// Create config with batch headers enabled
    pub fn with_headers() -> Self {
        Self {
            show_batch_headers: true,
            ..Self::default()
        }
    }
}

// =============================================================================
// Color Styles
// =============================================================================

/// Color styles for terminal output
struct Styles {
    timestamp: Style,
    label: Style,
    payload: Style,
    event: Style,
}

impl Styles {
    fn new(enabled: bool) -> Self {
        if enabled {
            Self {
                timestamp: Style::new().dimmed(),
                label: Style::new().dimmed(),
                payload: Style::new(),
                event: Style::new().yellow(),
            }
        } else {
            Self {
                timestamp: Style::new(),
                label: Style::new(),
                payload: Style::new(),
                event: Style::new(),
            }
        }
    }
}

/// Get style for a protocol tag
fn protocol_style(protocol: &str, enabled: bool) -> Style {
    if !enabled {
        return Style::new();
    }
    match protocol {
        "TCP" => Style::new().cyan(),
        "UDP" => Style::new().blue(),
        "DNS" | "MDNS" | "LLMNR" => Style::new().green(),
        "HTTP" | "TLS" | "QUIC" => Style::new().magenta(),
        "ICMP" | "ICMPV6" | "ARP" => Style::new().yellow(),
        "MODBUS" | "DNP3" | "S7COMM" => Style::new().red(),
        _ => Style::new(),
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Metrics for stdout sink
#[derive(Debug, Default)]
pub struct StdoutSinkMetrics {
    batches_received: AtomicU64,
    records_printed: AtomicU64,
    bytes_seen: AtomicU64,
}

impl StdoutSinkMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            batches_received: AtomicU64::new(0),
            records_printed: AtomicU64::new(0),
            bytes_seen: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_batch(&self, records: u64, bytes: u64) {
        self.batches_received.fetch_add(1, Ordering::Relaxed);
        self.records_printed.fetch_add(records, Ordering::Relaxed);
        self.bytes_seen.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_received: self.batches_received.load(Ordering::Relaxed),
            records_printed: self.records_printed.load(Ordering::Relaxed),
            bytes_seen: self.bytes_seen.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of stdout sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub batches_received: u64,
    pub records_printed: u64,
    pub bytes_seen: u64,
}

// =============================================================================
// StdoutSink Implementation
// =============================================================================

/// Prints records to stdout (or any writer)
pub struct StdoutSink {
    out: Mutex<Box<dyn Write + Send>>,
    config: StdoutConfig,
    name: String,
    metrics: Arc<StdoutSinkMetrics>,
}

impl StdoutSink {
    /// Create a new stdout sink with default config
    pub fn new() -> Self {
        Self::with_config(StdoutConfig::default())
    }

    /// Create a new stdout sink with custom config
    pub fn with_config(config: StdoutConfig) -> Self {
        Self::with_writer(io::stdout(), config)
    }

    /// Print to `writer` instead of stdout
    pub fn with_writer(writer: impl Write + Send + 'static, config: StdoutConfig) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
            config,
            name: "stdout".into(),
            metrics: Arc::new(StdoutSinkMetrics::new()),
        }
    }

    /// Get reference to metrics
    #[inline]
    pub fn metrics(&self) -> &Arc<StdoutSinkMetrics> {
        &self.metrics
    }

    fn write_batch(&self, out: &mut dyn Write, batch: &[PacketRecord]) -> io::Result<usize> {
        let styles = Styles::new(self.config.color);

        if self.config.show_batch_headers {
            let bytes: u64 = batch.iter().map(|r| r.size_bytes).sum();
            writeln!(out, "[BATCH] count={} bytes={}", batch.len(), bytes)?;
        }

        let max = if self.config.max_records == 0 {
            batch.len()
        } else {
            self.config.max_records.min(batch.len())
        };

        for record in &batch[..max] {
            writeln!(out, "{}", format_record(record, &styles, self.config.color))?;
        }
        out.flush()?;
        Ok(max)
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Consumer for StdoutSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, batch: &RecordBatch) -> Result<(), ConsumerError> {
        let mut out = self.out.lock();
        let printed = self.write_batch(out.as_mut(), batch)?;
        let bytes: u64 = batch.iter().map(|r| r.size_bytes).sum();
        self.metrics.record_batch(printed as u64, bytes);
        Ok(())
    }

    fn notify(&self, event: SessionEvent) -> Result<(), ConsumerError> {
        let styles = Styles::new(self.config.color);
        let mut out = self.out.lock();
        writeln!(out, "-- {} --", event.as_str().style(styles.event))?;
        out.flush()?;
        Ok(())
    }
}

/// One aligned output line for `record`
fn format_record(record: &PacketRecord, styles: &Styles, color: bool) -> String {
    let src = endpoint(&record.source_addr, &record.source_port);
    let dst = endpoint(&record.dest_addr, &record.dest_port);
    let protocol = format!("{:6}", record.protocol);

    format!(
        "{} {} {:21} {} {:21} {:>6} {}",
        record.captured_at.style(styles.timestamp),
        protocol.style(protocol_style(&record.protocol, color)),
        src,
        "->".style(styles.label),
        dst,
        record.size_bytes,
        record.payload_summary.style(styles.payload)
    )
}

/// `addr:port`, or the bare address when there is no port
fn endpoint(addr: &str, port: &str) -> String {
    if port == NO_PORT {
        addr.to_string()
    } else {
        format!("{addr}:{port}")
    }
}
