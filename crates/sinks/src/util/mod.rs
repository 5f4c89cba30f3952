//! Sink utilities
//!
//! - **rate_limited_logger**: collapses high-rate warnings into one summary
//!   line per interval
//! - **atomic_write**: temp-file-and-rename artifact writes

pub mod atomic_write;
pub mod rate_limited_logger;

pub use atomic_write::{pretty_json, write_atomic};
pub use rate_limited_logger::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};
