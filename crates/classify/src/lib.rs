//! Sift Classify - Reduce decoded packets to triage records
//!
//! The classifier turns one `DecodedPacket` into one `PacketRecord`:
//!
//! ```text
//! DecodedPacket
//!     │
//!     ├── addresses / ports ──► sentinels when absent ("N/A", "-")
//!     ├── protocol tag ──────► UDP first, then highest layer
//!     └── payload summary
//!           ├── opaque layer scan (TLS, QUIC, LLMNR, SSDP)
//!           ├── latency probe (opt-in, UDP to the probe port)
//!           ├── SummarizerRegistry[tag]  (HTTP, DNS, ARP, TCP, ...)
//!           ├── first field of the layer named after the tag
//!           └── printable raw-frame fallback
//! ```
//!
//! The `filter` module evaluates Wireshark-style display filters against
//! decoded packets for sources that cannot filter on their own.

mod classifier;
mod error;
pub mod filter;
mod probe;
mod registry;
pub mod summaries;

pub use classifier::{Classifier, ClassifierConfig, protocol_tag};
pub use error::{ClassifyError, Result};
pub use filter::{DisplayFilter, FilterError};
pub use probe::{DEFAULT_PROBE_PORT, LatencyProbe};
pub use registry::{Summarizer, SummarizerRegistry};
