//! Sift Sources - Capture sources that produce decoded packets
//!
//! A capture source hands already-dissected packets to the ingestion worker.
//! Sources are polled with a timeout so the worker can observe stop and
//! pause requests even while the source is quiet.
//!
//! # Available Sources
//!
//! - **tshark** - Live capture through an external dissector emitting EK JSON
//! - **replay** - Newline-delimited EK JSON file, optionally paced in real time
//! - **channel** - Packets injected in-process through a `PacketInjector`
//!
//! # Contract
//!
//! - `next_packet` returns within roughly `timeout`, yielding `Next::Idle`
//!   when nothing arrived
//! - `Next::End` marks exhaustion; errors end the session
//! - `close` is called exactly once per opened source, on every exit path
//!
//! # Example
//!
//! ```ignore
//! use sift_sources::{ReplayFactory, SourceFactory, Next};
//!
//! let factory = ReplayFactory::default();
//! let mut source = factory.open(&"capture.ndjson".into(), "")?;
//! while let Next::Packet(packet) = source.next_packet(Duration::from_millis(100))? {
//!     println!("{}", packet.highest_layer);
//! }
//! source.close()?;
//! ```

pub mod channel;
pub mod ek;
pub mod replay;
pub mod tshark;

mod common;
mod error;

use std::time::Duration;

use sift_protocol::{DecodedPacket, SourceId};

pub use channel::{ChannelFactory, ChannelSource, PacketInjector};
pub use common::{MetricsSnapshot, SourceMetrics};
pub use error::{Result, SourceError};
pub use replay::{ReplayConfig, ReplayFactory, ReplaySource};
pub use tshark::{TsharkConfig, TsharkFactory, TsharkSource};

/// Outcome of one poll
#[derive(Debug)]
pub enum Next {
    /// A decoded packet
    Packet(DecodedPacket),
    /// Nothing arrived within the timeout
    Idle,
    /// The source is exhausted
    End,
}

/// A source of decoded packets
pub trait CaptureSource: Send {
    /// Identifier this source was opened with
    fn id(&self) -> &SourceId;

    /// Wait up to `timeout` for the next packet
    fn next_packet(&mut self, timeout: Duration) -> Result<Next>;

    /// Release the source; called exactly once
    fn close(&mut self) -> Result<()>;

    /// Whether the display filter was applied by the source itself
    fn filters_natively(&self) -> bool;
}

/// Opens capture sources for a session
pub trait SourceFactory: Send + Sync {
    /// Open `source` with `filter` (blank = no filter)
    fn open(&self, source: &SourceId, filter: &str) -> Result<Box<dyn CaptureSource>>;

    /// Whether opened sources apply the filter themselves
    fn filters_natively(&self) -> bool;

    /// Name used in logs
    fn name(&self) -> &'static str;
}
