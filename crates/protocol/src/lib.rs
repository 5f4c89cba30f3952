//! Sift Protocol - Core types that flow through the triage pipeline
//!
//! This crate provides the foundational types shared by every stage:
//! - `DecodedPacket` - A packet already dissected into named layer fields
//! - `PacketRecord` - The fixed-shape summary produced for each packet
//! - `UsageTable` - Per-second cumulative byte counts in first-seen order
//! - `SourceId` - Identifier of the interface or replay file being captured
//! - `Consumer` - The contract every fan-out consumer implements
//!
//! # Design Principles
//!
//! - **Fixed column set**: records never omit a field, absence is a sentinel
//! - **Immutable records**: created once, then shared via `Arc<[PacketRecord]>`
//! - **Tolerant lookups**: field access on decoded packets returns `Option`

mod consumer;
mod error;
mod packet;
mod record;
mod source;
mod text;
mod usage;

pub use consumer::{Consumer, ConsumerError, RecordBatch, SessionEvent};
pub use error::ProtocolError;
pub use packet::{DecodedPacket, Layer};
pub use record::{NO_ADDRESS, NO_PAYLOAD, NO_PORT, PacketRecord};
pub use source::SourceId;
pub use text::{
    MAX_SUMMARY_LEN, clean_summary, printable_bytes, sanitize_printable, truncate_chars,
};
pub use usage::{UsageBucket, UsageTable};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Display format of `PacketRecord::captured_at` and usage keys
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S";

#[cfg(test)]
mod packet_test;
#[cfg(test)]
mod record_test;
#[cfg(test)]
mod source_test;
