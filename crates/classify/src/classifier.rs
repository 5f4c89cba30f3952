//! Packet classifier
//!
//! `Classifier::classify` produces exactly one record per packet. The only
//! failure is a packet with no wire length; everything else falls back to a
//! sentinel, and summarizer errors become an `Error: <cause>` summary.

use chrono::{DateTime, Local, Utc};
use tracing::trace;

use sift_protocol::{
    DecodedPacket, NO_ADDRESS, NO_PAYLOAD, NO_PORT, PacketRecord, TIMESTAMP_FORMAT,
    clean_summary, truncate_chars,
};

use crate::error::{ClassifyError, Result};
use crate::probe::LatencyProbe;
use crate::registry::SummarizerRegistry;
use crate::summaries;

#[cfg(test)]
#[path = "classifier_test.rs"]
mod tests;

/// Longest error cause kept in an `Error: ...` summary
const ERROR_CAUSE_LEN: usize = 20;

/// Tag used when the dissector reported no highest layer
const UNKNOWN_PROTOCOL: &str = "UNKNOWN";

/// Classifier configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Decode latency probes on this UDP port (None = disabled)
    pub latency_probe_port: Option<u16>,
}

impl ClassifierConfig {
    /// Enable the latency probe decoder on `port`
    pub fn with_latency_probe(mut self, port: u16) -> Self {
        self.latency_probe_port = Some(port);
        self
    }
}

/// Stateless packet classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    registry: SummarizerRegistry,
    probe: Option<LatencyProbe>,
}

impl Classifier {
    /// Classifier with the built-in summarizers
    pub fn new(config: &ClassifierConfig) -> Self {
        Self::with_registry(config, SummarizerRegistry::with_defaults())
    }

    /// Classifier with a caller-provided registry
    pub fn with_registry(config: &ClassifierConfig, registry: SummarizerRegistry) -> Self {
        Self {
            registry,
            probe: config.latency_probe_port.map(LatencyProbe::new),
        }
    }

    #[inline]
    pub fn registry(&self) -> &SummarizerRegistry {
        &self.registry
    }

    #[inline]
    pub fn probe(&self) -> Option<&LatencyProbe> {
        self.probe.as_ref()
    }

    /// Classify against the current wall clock
    pub fn classify(&self, packet: &DecodedPacket) -> Result<PacketRecord> {
        self.classify_at(packet, Utc::now())
    }

    /// Classify with an explicit "now" (used by the latency probe)
    pub fn classify_at(&self, packet: &DecodedPacket, now: DateTime<Utc>) -> Result<PacketRecord> {
        let size_bytes = packet.length.ok_or(ClassifyError::MissingLength)?;
        let protocol = protocol_tag(packet);

        let (source_addr, dest_addr) = match packet.network() {
            Some(net) => (
                net.get_non_empty("src").unwrap_or(NO_ADDRESS).to_string(),
                net.get_non_empty("dst").unwrap_or(NO_ADDRESS).to_string(),
            ),
            None => (NO_ADDRESS.to_string(), NO_ADDRESS.to_string()),
        };

        let (source_port, dest_port) = match packet.transport() {
            Some(transport) => (
                transport.get_non_empty("srcport").unwrap_or(NO_PORT).to_string(),
                transport.get_non_empty("dstport").unwrap_or(NO_PORT).to_string(),
            ),
            None => (NO_PORT.to_string(), NO_PORT.to_string()),
        };

        let summary = match self.summarize(packet, &protocol, now) {
            Ok(Some(summary)) => summary,
            Ok(None) => NO_PAYLOAD.to_string(),
            Err(e) => {
                trace!(protocol = %protocol, error = %e, "payload summary failed");
                format!("Error: {}", truncate_chars(&e.to_string(), ERROR_CAUSE_LEN))
            }
        };

        Ok(PacketRecord {
            captured_at: packet
                .captured_at
                .with_timezone(&Local)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
            source_addr,
            dest_addr,
            protocol,
            source_port,
            dest_port,
            size_bytes,
            payload_summary: clean_summary(&summary),
        })
    }

    fn summarize(
        &self,
        packet: &DecodedPacket,
        protocol: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        if let Some(summary) = summaries::opaque(packet) {
            return Ok(Some(summary));
        }

        if protocol == "UDP"
            && let Some(probe) = &self.probe
            && probe.matches(packet)
        {
            return Ok(Some(probe.summarize(packet, now)));
        }

        let summarizer = self.registry.get(protocol).or_else(|| {
            packet
                .has_layer("tcp")
                .then(|| self.registry.get("TCP"))
                .flatten()
        });

        let summary = match summarizer {
            Some(summarize) => summarize(packet)?,
            None => summaries::first_field(packet, protocol),
        };

        Ok(summary.or_else(|| summaries::raw_frame(packet)))
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

/// `UDP` whenever a UDP layer exists, otherwise the highest layer
pub fn protocol_tag(packet: &DecodedPacket) -> String {
    if packet.has_layer("udp") {
        "UDP".to_string()
    } else if packet.highest_layer.trim().is_empty() {
        UNKNOWN_PROTOCOL.to_string()
    } else {
        packet.highest_layer.trim().to_ascii_uppercase()
    }
}
