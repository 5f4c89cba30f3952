//! Distribution channel between the ingestion worker and the fan-out
//!
//! An ordered FIFO of records with an explicit overflow policy:
//!
//! - `DropNewest` (default): a full channel refuses the record being pushed;
//!   the producer never waits
//! - `Block`: the producer waits for room, in slices, so a cancelled session
//!   stops waiting within one slice
//!
//! The channel outlives sessions. Records are never reordered or
//! deduplicated.

use std::fmt;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, SendTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use sift_protocol::PacketRecord;

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;

/// Longest single wait of a blocked producer before re-checking cancellation
const BLOCK_SLICE: Duration = Duration::from_millis(50);

/// What a full channel does with a new record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait for room
    Block,
    /// Drop the record being pushed
    #[default]
    DropNewest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Block => "block",
            Self::DropNewest => "drop_newest",
        })
    }
}

/// Result of a push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The record is queued
    Queued,
    /// The channel was full and the record was dropped
    Dropped,
    /// The session was cancelled while waiting for room
    Cancelled,
}

/// Bounded (or unbounded) record queue
pub struct DistributionChannel {
    sender: Sender<PacketRecord>,
    receiver: Receiver<PacketRecord>,
    capacity: Option<usize>,
    policy: OverflowPolicy,
}

impl DistributionChannel {
    /// Create a channel; `capacity` of `None` means unbounded
    pub fn new(capacity: Option<usize>, policy: OverflowPolicy) -> Self {
        let (sender, receiver) = match capacity {
            Some(cap) => channel::bounded(cap.max(1)),
            None => channel::unbounded(),
        };
        Self {
            sender,
            receiver,
            capacity: capacity.map(|cap| cap.max(1)),
            policy,
        }
    }

    /// Push one record according to the overflow policy
    pub fn push(&self, record: PacketRecord, cancel: &CancellationToken) -> PushOutcome {
        match self.policy {
            OverflowPolicy::DropNewest => match self.sender.try_send(record) {
                Ok(()) => PushOutcome::Queued,
                Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => PushOutcome::Dropped,
            },
            OverflowPolicy::Block => {
                let mut record = record;
                loop {
                    match self.sender.send_timeout(record, BLOCK_SLICE) {
                        Ok(()) => return PushOutcome::Queued,
                        Err(SendTimeoutError::Timeout(back)) => {
                            if cancel.is_cancelled() {
                                return PushOutcome::Cancelled;
                            }
                            record = back;
                        }
                        Err(SendTimeoutError::Disconnected(_)) => return PushOutcome::Dropped,
                    }
                }
            }
        }
    }

    /// Take up to `max` records in FIFO order without waiting
    pub fn drain(&self, max: usize) -> Vec<PacketRecord> {
        self.receiver.try_iter().take(max).collect()
    }

    /// Discard everything queued; returns how many records were discarded
    pub fn clear(&self) -> usize {
        self.receiver.try_iter().count()
    }

    /// Records currently queued
    #[inline]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    #[inline]
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}

impl fmt::Debug for DistributionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributionChannel")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .finish()
    }
}
