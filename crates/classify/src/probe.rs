//! Latency probe decoder
//!
//! Probe datagrams sent to a fixed UDP port carry a big-endian header
//! followed by a UTF-8 JSON body with a `message` field:
//!
//! ```text
//! extended (20 bytes): f64 sent_secs | u32 sequence | u64 sent_nanos | {"message": ...}
//! legacy   (12 bytes): f64 sent_secs | u32 sequence                  | {"message": ...}
//! ```
//!
//! The decoder renders a one-line delay report. Every parse failure degrades
//! to less-derived output; it never errors.

use chrono::{DateTime, Utc};
use sift_protocol::{DecodedPacket, truncate_chars};

#[cfg(test)]
#[path = "probe_test.rs"]
mod tests;

/// Port probes are sent to unless configured otherwise
pub const DEFAULT_PROBE_PORT: u16 = 12345;

/// Ethernet + IPv4 + UDP header bytes preceding the payload in a raw frame
const RAW_FRAME_PAYLOAD_OFFSET: usize = 42;

const EXTENDED_HEADER_LEN: usize = 20;
const LEGACY_HEADER_LEN: usize = 12;

/// Message shown when the body has no `message` field
const NO_MESSAGE: &str = "N/A";

/// Message shown when the body is not a JSON object
const BAD_MESSAGE: &str = "Parse error";

/// Decoder for latency probe datagrams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyProbe {
    port: u16,
}

impl LatencyProbe {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the packet is UDP addressed to the probe port
    pub fn matches(&self, packet: &DecodedPacket) -> bool {
        packet
            .layer("udp")
            .and_then(|udp| udp.parse_u64("dstport"))
            .and_then(|port| port.ok())
            == Some(u64::from(self.port))
    }

    /// Render the delay report relative to `now`
    pub fn summarize(&self, packet: &DecodedPacket, now: DateTime<Utc>) -> String {
        let payload = probe_payload(packet).unwrap_or_default();

        if payload.len() >= EXTENDED_HEADER_LEN {
            let (sent_secs, sequence) = read_legacy_header(&payload);
            let sent_nanos = read_u64(&payload[12..20]);
            let message = read_message(&payload[EXTENDED_HEADER_LEN..]);

            let delay_ms = (nanos_since_epoch(now) - i128::from(sent_nanos)) as f64 / 1_000_000.0;
            if delay_ms < 0.0 {
                let alt_ms = (secs_since_epoch(now) - sent_secs) * 1000.0;
                format!(
                    "Seq:{sequence} Delay:{delay_ms:.1}ms(NEG!) Alt:{alt_ms:.1}ms Msg:{}",
                    truncate_chars(&message, 15)
                )
            } else {
                format!(
                    "Seq:{sequence} Delay:{delay_ms:.1}ms Msg:{}",
                    truncate_chars(&message, 20)
                )
            }
        } else if payload.len() >= LEGACY_HEADER_LEN {
            let (sent_secs, sequence) = read_legacy_header(&payload);
            let message = read_message(&payload[LEGACY_HEADER_LEN..]);

            let delay_ms = (secs_since_epoch(now) - sent_secs) * 1000.0;
            if delay_ms < 0.0 {
                format!(
                    "Seq:{sequence} Delay:{delay_ms:.1}ms(NEG-OLD!) Msg:{}",
                    truncate_chars(&message, 15)
                )
            } else {
                format!(
                    "Seq:{sequence} Delay:{delay_ms:.1}ms Msg:{}",
                    truncate_chars(&message, 20)
                )
            }
        } else {
            let (attrs, length) = match packet.layer("udp") {
                Some(udp) => (
                    udp.field_names().take(3).collect::<Vec<_>>().join(","),
                    udp.get_non_empty("length").unwrap_or(NO_MESSAGE).to_string(),
                ),
                None => (String::new(), NO_MESSAGE.to_string()),
            };
            format!("Port:{} Attrs:{attrs} Len:{length}", self.port)
        }
    }
}

impl Default for LatencyProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_PORT)
    }
}

/// Payload bytes from `udp.payload`, then `data.data`, then the raw frame
fn probe_payload(packet: &DecodedPacket) -> Option<Vec<u8>> {
    let from_field = |layer: &str, field: &str| {
        packet
            .layer(layer)
            .and_then(|l| l.bytes(field))
            .and_then(|bytes| bytes.ok())
    };

    from_field("udp", "payload")
        .or_else(|| from_field("data", "data"))
        .or_else(|| {
            packet
                .frame_raw
                .as_deref()
                .filter(|raw| raw.len() > RAW_FRAME_PAYLOAD_OFFSET)
                .map(|raw| raw[RAW_FRAME_PAYLOAD_OFFSET..].to_vec())
        })
}

/// `(sent_secs, sequence)` from the first 12 bytes
fn read_legacy_header(payload: &[u8]) -> (f64, u32) {
    let mut secs = [0u8; 8];
    secs.copy_from_slice(&payload[0..8]);
    let mut seq = [0u8; 4];
    seq.copy_from_slice(&payload[8..12]);
    (f64::from_be_bytes(secs), u32::from_be_bytes(seq))
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}

fn read_message(body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("message") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => NO_MESSAGE.to_string(),
        },
        _ => BAD_MESSAGE.to_string(),
    }
}

fn nanos_since_epoch(now: DateTime<Utc>) -> i128 {
    i128::from(now.timestamp()) * 1_000_000_000 + i128::from(now.timestamp_subsec_nanos())
}

fn secs_since_epoch(now: DateTime<Utc>) -> f64 {
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9
}
