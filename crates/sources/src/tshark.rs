//! Live capture through an external `tshark` process
//!
//! The process is spawned with `-l -n -T ek -i <interface>` (plus `-Y` for a
//! display filter and `-x` for raw bytes). A reader thread decodes stdout
//! lines and feeds a bounded channel; `next_packet` polls that channel. When
//! the channel is full the reader blocks, so the pipe applies backpressure to
//! the dissector rather than growing without limit.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use sift_protocol::{DecodedPacket, SourceId};

use crate::common::SourceMetrics;
use crate::ek;
use crate::error::{Result, SourceError};
use crate::{CaptureSource, Next, SourceFactory};

/// Longest stderr excerpt kept for an exit error
const STDERR_LIMIT: usize = 512;

/// Live capture configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsharkConfig {
    /// Program to run
    pub program: String,
    /// Arguments appended after the generated ones
    pub extra_args: Vec<String>,
    /// Decoded packets buffered between the reader thread and the worker
    pub channel_capacity: usize,
    /// Request raw frame bytes (`-x`) for the fallback summary
    pub include_raw: bool,
}

impl Default for TsharkConfig {
    fn default() -> Self {
        Self {
            program: "tshark".into(),
            extra_args: Vec::new(),
            channel_capacity: 1000,
            include_raw: true,
        }
    }
}

impl TsharkConfig {
    /// Arguments for capturing from `interface` with `filter`
    pub fn args(&self, interface: &str, filter: &str) -> Vec<String> {
        let mut args: Vec<String> = ["-l", "-n", "-T", "ek", "-i", interface]
            .into_iter()
            .map(String::from)
            .collect();
        let filter = filter.trim();
        if !filter.is_empty() {
            args.push("-Y".into());
            args.push(filter.into());
        }
        if self.include_raw {
            args.push("-x".into());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Spawns one capture process per session
#[derive(Debug, Clone, Default)]
pub struct TsharkFactory {
    config: TsharkConfig,
    metrics: Arc<SourceMetrics>,
}

impl TsharkFactory {
    pub fn new(config: TsharkConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(SourceMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<SourceMetrics> {
        &self.metrics
    }
}

impl SourceFactory for TsharkFactory {
    fn open(&self, source: &SourceId, filter: &str) -> Result<Box<dyn CaptureSource>> {
        let args = self.config.args(source.as_str(), filter);
        let mut child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SourceError::Spawn {
                program: self.config.program.clone(),
                source: e,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::Exited("capture process has no stdout".into()))?;
        let stderr = child.stderr.take();

        let (sender, receiver) = channel::bounded(self.config.channel_capacity.max(1));
        let reader = spawn_reader(
            source.clone(),
            stdout,
            sender,
            Arc::clone(&self.metrics),
        )?;

        self.metrics.source_opened();
        info!(
            source = %source,
            program = %self.config.program,
            filter = filter.trim(),
            pid = child.id(),
            "capture process started"
        );

        Ok(Box::new(TsharkSource {
            id: source.clone(),
            child: Some(child),
            stderr,
            receiver: Some(receiver),
            reader: Some(reader),
            metrics: Arc::clone(&self.metrics),
        }))
    }

    fn filters_natively(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "tshark"
    }
}

fn spawn_reader(
    id: SourceId,
    stdout: impl Read + Send + 'static,
    sender: Sender<DecodedPacket>,
    metrics: Arc<SourceMetrics>,
) -> Result<JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("tshark-reader".into())
        .spawn(move || read_lines(&id, BufReader::new(stdout), &sender, &metrics))?;
    Ok(handle)
}

fn read_lines(
    id: &SourceId,
    reader: impl BufRead,
    sender: &Sender<DecodedPacket>,
    metrics: &SourceMetrics,
) {
    for (idx, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(source = %id, error = %e, "capture output read failed");
                break;
            }
        };

        match ek::parse_line(&line, idx + 1) {
            Ok(Some(packet)) => {
                if sender.send(packet).is_err() {
                    // receiver dropped: the session is closing
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                metrics.malformed_record();
                warn!(source = %id, error = %e, "skipping capture line");
            }
        }
    }
    debug!(source = %id, "capture reader finished");
}

/// A running capture process
pub struct TsharkSource {
    id: SourceId,
    child: Option<Child>,
    stderr: Option<ChildStderr>,
    receiver: Option<Receiver<DecodedPacket>>,
    reader: Option<JoinHandle<()>>,
    metrics: Arc<SourceMetrics>,
}

impl TsharkSource {
    /// Exit outcome once stdout has closed
    fn finish(&mut self) -> Result<Next> {
        let Some(child) = self.child.as_mut() else {
            return Ok(Next::End);
        };
        let status = child.wait()?;
        if status.success() {
            return Ok(Next::End);
        }

        let mut message = String::new();
        if let Some(mut stderr) = self.stderr.take() {
            let _ = stderr.read_to_string(&mut message);
        }
        let message = message.trim();
        let excerpt = sift_protocol::truncate_chars(message, STDERR_LIMIT);
        Err(SourceError::Exited(if excerpt.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {excerpt}")
        }))
    }
}

impl CaptureSource for TsharkSource {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn next_packet(&mut self, timeout: Duration) -> Result<Next> {
        let Some(receiver) = self.receiver.as_ref() else {
            return Ok(Next::End);
        };
        match receiver.recv_timeout(timeout) {
            Ok(packet) => {
                self.metrics.packet_read(packet.length.unwrap_or(0));
                Ok(Next::Packet(packet))
            }
            Err(RecvTimeoutError::Timeout) => Ok(Next::Idle),
            Err(RecvTimeoutError::Disconnected) => self.finish(),
        }
    }

    fn close(&mut self) -> Result<()> {
        // unblocks a reader waiting on a full channel
        drop(self.receiver.take());

        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!(source = %self.id, error = %e, "capture process already gone");
            }
            child.wait()?;
        }
        if let Some(reader) = self.reader.take()
            && reader.join().is_err()
        {
            warn!(source = %self.id, "capture reader panicked");
        }

        self.metrics.source_closed();
        info!(source = %self.id, "capture process stopped");
        Ok(())
    }

    fn filters_natively(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for TsharkSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsharkSource")
            .field("id", &self.id)
            .field("pid", &self.child.as_ref().map(Child::id))
            .finish()
    }
}
