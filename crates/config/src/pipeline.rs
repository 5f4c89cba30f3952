//! Channel, worker and fan-out configuration

use std::time::Duration;

use serde::Deserialize;

/// What a full distribution channel does with a new record
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Overflow {
    /// Drop the record being pushed and count it (default)
    #[default]
    DropNewest,
    /// Make the worker wait for room
    Block,
}

/// Distribution channel configuration
///
/// # Example
///
/// ```toml
/// [channel]
/// capacity = 10000   # 0 = unbounded
/// overflow = "drop_newest"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChannelConfig {
    /// Records the channel holds before `overflow` applies (0 = unbounded)
    /// Default: 10000
    pub capacity: usize,

    /// Default: drop_newest
    pub overflow: Overflow,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            overflow: Overflow::DropNewest,
        }
    }
}

impl ChannelConfig {
    /// `None` when unbounded
    pub fn bound(&self) -> Option<usize> {
        (self.capacity > 0).then_some(self.capacity)
    }
}

/// Session worker configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkerConfig {
    /// How long `stop` waits for the worker before detaching it
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub stop_timeout: Duration,

    /// Discard records the previous session left queued when a new one starts
    /// Default: false
    pub drain_on_restart: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(5),
            drain_on_restart: false,
        }
    }
}

/// Fan-out batching and pacing
///
/// # Example
///
/// ```toml
/// [fanout]
/// batch_size = 50
/// busy_threshold = 10
/// busy_delay = "50ms"
/// partial_delay = "200ms"
/// idle_delay = "300ms"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FanoutConfig {
    pub batch_size: usize,
    /// Batches at least this large count as busy
    pub busy_threshold: usize,
    #[serde(with = "humantime_serde")]
    pub busy_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub partial_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub idle_delay: Duration,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            busy_threshold: 10,
            busy_delay: Duration::from_millis(50),
            partial_delay: Duration::from_millis(200),
            idle_delay: Duration::from_millis(300),
        }
    }
}
