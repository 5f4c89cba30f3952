//! Wire protocol for the subscriber feed
//!
//! Newline-delimited JSON in both directions. The client sends exactly one
//! [`SubscribeRequest`] line (a blank line subscribes with defaults); the
//! server then streams [`FeedMessage`] lines.
//!
//! ```text
//! client → {"protocols":["TCP"],"last_n":100}
//! server ← {"event":"all_packets","packets":[...]}
//! server ← {"event":"new_packets","packets":[...]}
//! server ← {"event":"capture_stopped"}
//! server ← {"event":"heartbeat"}
//! ```

use serde::{Deserialize, Serialize};

use sift_protocol::{PacketRecord, SessionEvent};

use crate::error::Result;

/// Subscription request from a client
///
/// All filters are optional; `None` matches everything.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscribeRequest {
    /// Protocol tags to receive (case-insensitive, e.g. `TCP`, `DNS`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<String>>,
    /// Addresses to receive; a record matches on source or destination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<String>>,
    /// Replay at most this many buffered records (`None` = all of them)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_n: Option<usize>,
    /// Fraction of batches to receive (0.0-1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<f32>,
    /// Maximum batches per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batches_per_sec: Option<u32>,
}

impl SubscribeRequest {
    /// Subscribe to everything
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protocols<S: Into<String>>(mut self, protocols: impl IntoIterator<Item = S>) -> Self {
        self.protocols = Some(protocols.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_addresses<S: Into<String>>(mut self, addresses: impl IntoIterator<Item = S>) -> Self {
        self.addresses = Some(addresses.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_last_n(mut self, n: usize) -> Self {
        self.last_n = Some(n);
        self
    }

    pub fn with_sample_rate(mut self, rate: f32) -> Self {
        self.sample_rate = Some(rate.clamp(0.0, 1.0));
        self
    }

    pub fn with_rate_limit(mut self, batches_per_sec: u32) -> Self {
        self.max_batches_per_sec = Some(batches_per_sec);
        self
    }

    /// Parse the request line; blank means defaults
    pub fn from_line(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(line)?)
    }

    /// Encode as one newline-terminated line
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Server → client messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedMessage {
    /// Buffered history, sent once right after subscribing
    AllPackets { packets: Vec<PacketRecord> },
    /// A live batch
    NewPackets { packets: Vec<PacketRecord> },
    CaptureStarted,
    CaptureStopped,
    DataCleared,
    /// Keep-alive
    Heartbeat,
    /// The request was rejected; the server closes the connection after it
    Error { message: String },
}

impl FeedMessage {
    /// Encode as one newline-terminated line
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decode one line (trailing newline optional)
    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim_end())?)
    }

    /// Wire name of the message
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::AllPackets { .. } => "all_packets",
            Self::NewPackets { .. } => "new_packets",
            Self::CaptureStarted => "capture_started",
            Self::CaptureStopped => "capture_stopped",
            Self::DataCleared => "data_cleared",
            Self::Heartbeat => "heartbeat",
            Self::Error { .. } => "error",
        }
    }
}

impl From<SessionEvent> for FeedMessage {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::CaptureStarted => Self::CaptureStarted,
            SessionEvent::CaptureStopped => Self::CaptureStopped,
            SessionEvent::DataCleared => Self::DataCleared,
        }
    }
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
