//! Per-second byte usage
//!
//! `UsageTable` maps a timestamp key to the cumulative number of bytes seen in
//! that second. Keys iterate in order of first observation.
//!
//! Keys are `HH:MM:SS` and carry no date. A key that falls more than twelve
//! hours behind the previous one starts a new day, so a session that runs
//! past midnight gets fresh buckets instead of adding to yesterday's. Keys
//! are unique within a day; the serialized list may repeat one across days.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One `{timestamp, data_usage}` entry
///
/// `data_usage` is serialized as a string-encoded integer, the shape reporting
/// tools read from `data_usage.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageBucket {
    pub timestamp: String,
    #[serde(
        rename = "data_usage",
        serialize_with = "serialize_as_string",
        deserialize_with = "deserialize_from_string"
    )]
    pub bytes: u64,
}

fn serialize_as_string<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn deserialize_from_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// A key further behind the previous one than this is on the next day
const DAY_ROLLOVER_SECS: u32 = 12 * 3600;

/// Insertion-ordered usage table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageTable {
    buckets: Vec<UsageBucket>,
    /// (day, key) -> position in `buckets`
    index: HashMap<(u32, String), usize>,
    day: u32,
    /// Second of day of the last key added
    last_second: Option<u32>,
}

impl UsageTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `bytes` to the bucket for `timestamp`, creating it on first sight
    pub fn add(&mut self, timestamp: &str, bytes: u64) {
        if let Some(second) = second_of_day(timestamp) {
            if self
                .last_second
                .is_some_and(|last| last.saturating_sub(second) > DAY_ROLLOVER_SECS)
            {
                self.day += 1;
            }
            self.last_second = Some(second);
        }

        let key = (self.day, timestamp.to_string());
        match self.index.get(&key) {
            Some(&pos) => {
                self.buckets[pos].bytes = self.buckets[pos].bytes.saturating_add(bytes);
            }
            None => {
                self.index.insert(key, self.buckets.len());
                self.buckets.push(UsageBucket {
                    timestamp: timestamp.to_string(),
                    bytes,
                });
            }
        }
    }

    /// Cumulative bytes for `timestamp` on the current day
    pub fn get(&self, timestamp: &str) -> Option<u64> {
        self.index
            .get(&(self.day, timestamp.to_string()))
            .map(|&pos| self.buckets[pos].bytes)
    }

    /// Days the table has rolled over since it was created or cleared
    #[inline]
    pub fn day(&self) -> u32 {
        self.day
    }

    /// Buckets in first-seen order
    #[inline]
    pub fn buckets(&self) -> &[UsageBucket] {
        &self.buckets
    }

    /// Sum over all buckets
    pub fn total_bytes(&self) -> u64 {
        self.buckets.iter().map(|b| b.bytes).sum()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.index.clear();
        self.day = 0;
        self.last_second = None;
    }
}

/// `HH:MM:SS` as seconds since midnight
fn second_of_day(timestamp: &str) -> Option<u32> {
    let mut parts = timestamp.splitn(3, ':').map(|p| p.parse::<u32>().ok());
    let (h, m, s) = (parts.next()??, parts.next()??, parts.next()??);
    (h < 24 && m < 60 && s < 61).then_some(h * 3600 + m * 60 + s)
}

impl FromIterator<UsageBucket> for UsageTable {
    fn from_iter<I: IntoIterator<Item = UsageBucket>>(iter: I) -> Self {
        let mut table = Self::new();
        for bucket in iter {
            table.add(&bucket.timestamp, bucket.bytes);
        }
        table
    }
}
