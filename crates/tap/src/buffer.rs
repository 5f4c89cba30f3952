//! Ring buffer of recent records
//!
//! A new subscriber first receives the buffered history as one
//! `all_packets` message, then the live stream. The buffer is emptied when
//! a capture starts or data is cleared.
//!
//! The buffer is not synchronized; `TapPoint` guards it together with the
//! broadcast so history and live batches never overlap.

use std::collections::VecDeque;

use sift_protocol::PacketRecord;

/// Default number of records kept for replay
pub const DEFAULT_REPLAY_CAPACITY: usize = 1500;

/// Maximum capacity to prevent memory issues
const MAX_CAPACITY: usize = 100_000;

/// Fixed-capacity FIFO of the most recent records
#[derive(Debug)]
pub struct ReplayBuffer {
    records: VecDeque<PacketRecord>,
    capacity: usize,
    total_written: u64,
}

impl ReplayBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Capacity is clamped to `1..=100_000`
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_CAPACITY);
        Self {
            records: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            total_written: 0,
        }
    }

    /// Append records, evicting the oldest beyond capacity
    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a PacketRecord>) {
        for record in records {
            if self.records.len() == self.capacity {
                self.records.pop_front();
            }
            self.records.push_back(record.clone());
            self.total_written += 1;
        }
    }

    /// The last `n` records, oldest first (`None` = everything)
    pub fn last_n(&self, n: Option<usize>) -> Vec<PacketRecord> {
        let n = n.unwrap_or(self.records.len()).min(self.records.len());
        self.records
            .iter()
            .skip(self.records.len() - n)
            .cloned()
            .collect()
    }

    /// Records ever written since the last clear
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.total_written = 0;
    }
}

impl Default for ReplayBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod tests;
