//! Sift Tap - push-subscriber feed for live records (Unix only)
//!
//! `TapPoint` is a fan-out consumer. It keeps a ring buffer of recent
//! records for late joiners and forwards every batch and session event to
//! its subscribers. `TapServer` exposes it over a Unix socket speaking
//! newline-delimited JSON.
//!
//! - Filters on protocol tags and addresses per subscriber
//! - Supports client-requested rate limiting and sampling
//! - A slow subscriber loses batches; nobody else is held up
//! - Auto-cleans subscribers on disconnect
//!
//! # Architecture
//!
//! ```text
//! FanOut
//!   │
//!   ├──→ TUI / stdout consumers
//!   │
//!   └──→ TapPoint ◄── replay buffer (1500 records)
//!            │
//!            ▼
//!       Subscribers (per-client bounded channels)
//!            │
//!            ▼
//!       TapServer (Unix socket) ──→ `sift tail` clients
//! ```

#[cfg(unix)]
pub mod buffer;
#[cfg(unix)]
mod error;
#[cfg(unix)]
pub mod filter;
#[cfg(unix)]
pub mod protocol;
#[cfg(unix)]
pub mod server;
#[cfg(unix)]
pub mod subscriber;
#[cfg(unix)]
pub mod tap_point;

#[cfg(unix)]
pub use buffer::{DEFAULT_REPLAY_CAPACITY, ReplayBuffer};
#[cfg(unix)]
pub use error::{Result, TapError};
#[cfg(unix)]
pub use filter::TapFilter;
#[cfg(unix)]
pub use protocol::{FeedMessage, SubscribeRequest};
#[cfg(unix)]
pub use server::{DEFAULT_SOCKET_PATH, TapServer, TapServerConfig};
#[cfg(unix)]
pub use subscriber::{
    DEFAULT_MAX_SUBSCRIBERS, DEFAULT_SUBSCRIBER_BUFFER, Subscriber, SubscriberManager, TapItem,
};
#[cfg(unix)]
pub use tap_point::{Subscription, TapPoint, TapStats};
