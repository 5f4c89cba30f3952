//! Replay source - previously exported EK JSON files
//!
//! Produce a replay file from a capture with:
//!
//! ```text
//! tshark -r capture.pcapng -T ek -x > capture.ndjson
//! ```
//!
//! Malformed lines are skipped and counted. With `realtime` enabled, packets
//! are released according to the gaps between their capture timestamps
//! (capped by `max_gap`), while `next_packet` still honours its timeout.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use sift_protocol::{DecodedPacket, SourceId};

use crate::common::SourceMetrics;
use crate::ek;
use crate::error::{Result, SourceError};
use crate::{CaptureSource, Next, SourceFactory};

#[cfg(test)]
#[path = "replay_test.rs"]
mod tests;

/// Replay pacing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Reproduce inter-packet gaps
    pub realtime: bool,
    /// Longest gap reproduced in real-time mode
    pub max_gap: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            realtime: false,
            max_gap: Duration::from_secs(1),
        }
    }
}

/// Opens replay files
#[derive(Debug, Clone, Default)]
pub struct ReplayFactory {
    config: ReplayConfig,
    metrics: Arc<SourceMetrics>,
}

impl ReplayFactory {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(SourceMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<SourceMetrics> {
        &self.metrics
    }
}

impl SourceFactory for ReplayFactory {
    fn open(&self, source: &SourceId, _filter: &str) -> Result<Box<dyn CaptureSource>> {
        let file = File::open(source.as_str()).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound(source.to_string()),
            _ => SourceError::Io(e),
        })?;

        self.metrics.source_opened();
        debug!(source = %source, realtime = self.config.realtime, "replay opened");

        Ok(Box::new(ReplaySource::new(
            source.clone(),
            BufReader::new(file),
            self.config,
            Arc::clone(&self.metrics),
        )))
    }

    fn filters_natively(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "replay"
    }
}

/// Pending packet waiting for its release time
struct Pending {
    packet: DecodedPacket,
    due: Instant,
}

/// Reads packets from any buffered EK JSON stream
pub struct ReplaySource {
    id: SourceId,
    reader: Box<dyn BufRead + Send>,
    config: ReplayConfig,
    metrics: Arc<SourceMetrics>,
    line_no: usize,
    pending: Option<Pending>,
    /// Capture time and release time of the previously released packet
    last: Option<(chrono::DateTime<chrono::Utc>, Instant)>,
}

impl ReplaySource {
    pub fn new(
        id: SourceId,
        reader: impl BufRead + Send + 'static,
        config: ReplayConfig,
        metrics: Arc<SourceMetrics>,
    ) -> Self {
        Self {
            id,
            reader: Box::new(reader),
            config,
            metrics,
            line_no: 0,
            pending: None,
            last: None,
        }
    }

    /// Lines consumed so far
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    fn read_packet(&mut self) -> Result<Option<DecodedPacket>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            match ek::parse_line(&line, self.line_no) {
                Ok(Some(packet)) => return Ok(Some(packet)),
                Ok(None) => continue,
                Err(e) if e.is_recoverable() => {
                    self.metrics.malformed_record();
                    warn!(source = %self.id, error = %e, "skipping replay line");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn release_time(&self, packet: &DecodedPacket) -> Instant {
        let now = Instant::now();
        match self.last {
            Some((prev_at, prev_release)) if self.config.realtime => {
                let gap = (packet.captured_at - prev_at)
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    .min(self.config.max_gap);
                (prev_release + gap).max(now)
            }
            _ => now,
        }
    }

    fn release(&mut self, packet: DecodedPacket, due: Instant) -> Next {
        self.last = Some((packet.captured_at, due));
        self.metrics.packet_read(packet.length.unwrap_or(0));
        Next::Packet(packet)
    }
}

impl CaptureSource for ReplaySource {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn next_packet(&mut self, timeout: Duration) -> Result<Next> {
        let pending = match self.pending.take() {
            Some(pending) => pending,
            None => match self.read_packet()? {
                Some(packet) => {
                    let due = self.release_time(&packet);
                    Pending { packet, due }
                }
                None => return Ok(Next::End),
            },
        };

        let now = Instant::now();
        if pending.due <= now {
            return Ok(self.release(pending.packet, pending.due));
        }

        let wait = pending.due - now;
        if wait > timeout {
            std::thread::sleep(timeout);
            self.pending = Some(pending);
            return Ok(Next::Idle);
        }

        std::thread::sleep(wait);
        Ok(self.release(pending.packet, pending.due))
    }

    fn close(&mut self) -> Result<()> {
        self.metrics.source_closed();
        debug!(source = %self.id, lines = self.line_no, "replay closed");
        Ok(())
    }

    fn filters_natively(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for ReplaySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaySource")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("line_no", &self.line_no)
            .finish()
    }
}
