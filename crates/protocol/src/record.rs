//! The classified packet record
//!
//! Serialized field names (`timestamp`, `src_ip`, ...) are the column set of
//! the snapshot artifacts, the CSV export header, and the subscriber feed.

use serde::{Deserialize, Serialize};

/// Sentinel for a missing network-layer address
pub const NO_ADDRESS: &str = "N/A";

/// Sentinel for a missing transport-layer port
pub const NO_PORT: &str = "-";

/// Sentinel for a payload nothing could be derived from
pub const NO_PAYLOAD: &str = "N/A";

/// One classified packet
///
/// Every field is always present. Records are immutable once built and are
/// shared by value or behind `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PacketRecord {
    /// Local wall-clock time, `HH:MM:SS`
    #[serde(rename = "timestamp")]
    pub captured_at: String,
    #[serde(rename = "src_ip")]
    pub source_addr: String,
    #[serde(rename = "dst_ip")]
    pub dest_addr: String,
    /// Short uppercase protocol tag
    pub protocol: String,
    #[serde(rename = "src_port")]
    pub source_port: String,
    #[serde(rename = "dst_port")]
    pub dest_port: String,
    /// Wire length in bytes
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Printable summary, at most 40 characters
    #[serde(rename = "payload")]
    pub payload_summary: String,
}

impl PacketRecord {
    /// Whether the record carries a network-layer address
    #[inline]
    pub fn has_address(&self) -> bool {
        self.source_addr != NO_ADDRESS || self.dest_addr != NO_ADDRESS
    }

    /// Whether either address equals `addr`
    #[inline]
    pub fn involves(&self, addr: &str) -> bool {
        self.source_addr == addr || self.dest_addr == addr
    }
}
