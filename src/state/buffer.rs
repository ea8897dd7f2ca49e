use std::collections::VecDeque;

use super::data::PhotoRecord;

/// How many records survive a `push`
pub const CAPTURE_CAPACITY: usize = 3;

/// How many records `hydrate` keeps from the store
pub const HYDRATE_WINDOW: usize = 10;

/// In-memory mirror of the newest captures.
///
/// Eviction is FIFO: records are never looked up again once pushed, so the
/// oldest one always goes first.
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    records: VecDeque<PhotoRecord>,
    capacity: usize,
    hydrate_window: usize,
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new(CAPTURE_CAPACITY, HYDRATE_WINDOW)
    }
}

impl CaptureBuffer {
    pub fn new(capacity: usize, hydrate_window: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(hydrate_window.max(capacity) + 1),
            capacity,
            hydrate_window,
        }
    }

    /// Append a freshly committed record, then drop from the front until
    /// the buffer is back within `capacity`.
    ///
    /// This applies even right after a `hydrate` loaded a larger window.
    pub fn push(&mut self, record: PhotoRecord) {
        self.records.push_back(record);
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    /// Replace the contents with the tail of `records` (oldest first input)
    pub fn hydrate(&mut self, records: Vec<PhotoRecord>) {
        let skip = records.len().saturating_sub(self.hydrate_window);
        self.records = records.into_iter().skip(skip).collect();
    }

    /// Current contents, oldest to newest
    pub fn snapshot(&self) -> Vec<PhotoRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
