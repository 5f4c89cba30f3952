//! Scroll buffer - bounded record history for a scrolling terminal view
//!
//! `ScrollBuffer` is a fan-out consumer holding the most recent records.
//! `Viewport` tracks what a view of a given height shows: in follow mode it
//! pins to the newest records, scrolling up leaves follow mode, and reaching
//! the bottom again re-enters it.

use std::collections::VecDeque;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use sift_protocol::{Consumer, ConsumerError, PacketRecord, RecordBatch, SessionEvent};

#[cfg(test)]
#[path = "scroll_test.rs"]
mod tests;

/// Default number of records kept for scrolling
pub const DEFAULT_SCROLL_CAPACITY: usize = 10_000;

/// Bounded history of delivered records
#[derive(Debug)]
pub struct ScrollBuffer {
    lines: Mutex<VecDeque<PacketRecord>>,
    capacity: usize,
    received: AtomicU64,
    last_event: Mutex<Option<SessionEvent>>,
}

impl ScrollBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            received: AtomicU64::new(0),
            last_event: Mutex::new(None),
        }
    }

    /// Records currently held
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records delivered since creation, including ones scrolled out
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Most recent session event observed
    pub fn last_event(&self) -> Option<SessionEvent> {
        *self.last_event.lock()
    }

    /// Copy of the records in `range` (clamped to what is held)
    pub fn window(&self, range: Range<usize>) -> Vec<PacketRecord> {
        let lines = self.lines.lock();
        let end = range.end.min(lines.len());
        let start = range.start.min(end);
        lines.range(start..end).cloned().collect()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl Default for ScrollBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_CAPACITY)
    }
}

impl Consumer for ScrollBuffer {
    fn name(&self) -> &str {
        "scroll"
    }

    fn deliver(&self, batch: &RecordBatch) -> Result<(), ConsumerError> {
        let mut lines = self.lines.lock();
        for record in batch.iter() {
            if lines.len() >= self.capacity {
                lines.pop_front();
            }
            lines.push_back(record.clone());
        }
        self.received
            .fetch_add(batch.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn notify(&self, event: SessionEvent) -> Result<(), ConsumerError> {
        // a new session or a clear starts the view afresh
        if matches!(event, SessionEvent::CaptureStarted | SessionEvent::DataCleared) {
            self.clear();
        }
        *self.last_event.lock() = Some(event);
        Ok(())
    }
}

/// Scroll position of a view over a `ScrollBuffer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Index of the first visible record when not following
    offset: usize,
    follow: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: 0,
            follow: true,
        }
    }
}

impl Viewport {
    /// Whether the view is pinned to the newest records
    pub fn is_following(&self) -> bool {
        self.follow
    }

    /// Visible index range for `len` records and `height` rows
    pub fn visible(&self, len: usize, height: usize) -> Range<usize> {
        let max_offset = len.saturating_sub(height);
        let start = if self.follow {
            max_offset
        } else {
            self.offset.min(max_offset)
        };
        start..(start + height).min(len)
    }

    /// Scroll towards older records
    pub fn up(&mut self, rows: usize, len: usize, height: usize) {
        let start = self.visible(len, height).start;
        self.offset = start.saturating_sub(rows);
        self.follow = false;
    }

    /// Scroll towards newer records; re-enters follow mode at the bottom
    pub fn down(&mut self, rows: usize, len: usize, height: usize) {
        if self.follow {
            return;
        }
        let max_offset = len.saturating_sub(height);
        self.offset = (self.offset.min(max_offset) + rows).min(max_offset);
        if self.offset >= max_offset {
            self.follow = true;
        }
    }

    /// Jump to the oldest record
    pub fn top(&mut self) {
        self.offset = 0;
        self.follow = false;
    }

    /// Jump to the newest record and follow
    pub fn bottom(&mut self) {
        self.follow = true;
    }
}
