// Bounded live-reading history for sparkline rendering
use serde::Serialize;
use std::collections::VecDeque;

/// How many recent readings each gas keeps for its sparkline.
pub const LIVE_HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub time_ms: i64,
    pub value: f64,
}

/// Fixed-capacity push-and-evict queue of recent readings. Single
/// writer (the live subscription task); readers take snapshots.
#[derive(Debug, Clone)]
pub struct ReadingHistory {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl ReadingHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a reading, evicting the oldest once at capacity.
    pub fn push(&mut self, time_ms: i64, value: f64) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(HistoryPoint { time_ms, value });
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Oldest-first snapshot of the buffered points.
    pub fn snapshot(&self) -> Vec<HistoryPoint> {
        self.points.iter().copied().collect()
    }
}
