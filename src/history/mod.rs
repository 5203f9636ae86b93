//! Rolling per-metric history
//!
//! [`HistoryBuffer`] keeps the last `capacity` readings of one metric in
//! chronological order. Whole-buffer `average`, `min` and `max` are O(1):
//! the average uses a sliding sum that subtracts evicted values and is
//! recomputed from scratch once per `capacity` evictions to bound rounding
//! drift, and min/max use monotonic queues. Queries over a trailing window
//! are O(window).


use std::collections::VecDeque;

use crate::core::metrics::Reading;

/// Fixed-capacity rolling window of readings
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    capacity: usize,
    readings: VecDeque<Reading>,
    sum: f64,
    evictions_since_resum: usize,
    // (sequence number, value), values non-decreasing from front to back
    min_queue: VecDeque<(u64, f64)>,
    // (sequence number, value), values non-increasing from front to back
    max_queue: VecDeque<(u64, f64)>,
    next_seq: u64,
}

impl HistoryBuffer {
    /// Creates an empty buffer. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readings: VecDeque::with_capacity(capacity),
            sum: 0.0,
            evictions_since_resum: 0,
            min_queue: VecDeque::new(),
            max_queue: VecDeque::new(),
            next_seq: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Appends a reading, evicting the oldest one when full
    pub fn push(&mut self, reading: Reading) {
        if self.readings.len() == self.capacity {
            self.evict_oldest();
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let value = reading.value;

        while self.min_queue.back().is_some_and(|&(_, v)| v > value) {
            self.min_queue.pop_back();
        }
        self.min_queue.push_back((seq, value));

        while self.max_queue.back().is_some_and(|&(_, v)| v < value) {
            self.max_queue.pop_back();
        }
        self.max_queue.push_back((seq, value));

        self.sum += value;
        self.readings.push_back(reading);

        if self.evictions_since_resum >= self.capacity {
            self.sum = self.readings.iter().map(|r| r.value).sum();
            self.evictions_since_resum = 0;
        }
    }

    fn evict_oldest(&mut self) {
        let Some(oldest) = self.readings.pop_front() else {
            return;
        };
        // sequence number of the evicted reading
        let evicted_seq = self.next_seq - (self.readings.len() as u64 + 1);
        if self.min_queue.front().is_some_and(|&(s, _)| s == evicted_seq) {
            self.min_queue.pop_front();
        }
        if self.max_queue.front().is_some_and(|&(s, _)| s == evicted_seq) {
            self.max_queue.pop_front();
        }
        self.sum -= oldest.value;
        self.evictions_since_resum += 1;
    }

    /// Mean over the whole buffer, or over the trailing `window` readings.
    ///
    /// A window larger than the buffer covers the whole buffer. Returns
    /// `None` when the buffer (or a zero window) is empty.
    pub fn average(&self, window: Option<usize>) -> Option<f64> {
        match self.window_len(window)? {
            n if n == self.readings.len() => Some(self.sum / n as f64),
            n => Some(self.tail(n).map(|r| r.value).sum::<f64>() / n as f64),
        }
    }

    /// Smallest value in the buffer
    pub fn min(&self) -> Option<f64> {
        self.min_queue.front().map(|&(_, v)| v)
    }

    /// Largest value in the buffer
    pub fn max(&self) -> Option<f64> {
        self.max_queue.front().map(|&(_, v)| v)
    }

    /// Smallest value among the trailing `window` readings
    pub fn min_over(&self, window: usize) -> Option<f64> {
        let n = self.window_len(Some(window))?;
        self.tail(n).map(|r| r.value).reduce(f64::min)
    }

    /// Largest value among the trailing `window` readings
    pub fn max_over(&self, window: usize) -> Option<f64> {
        let n = self.window_len(Some(window))?;
        self.tail(n).map(|r| r.value).reduce(f64::max)
    }

    /// Most recent reading
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    /// Readings from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
        self.min_queue.clear();
        self.max_queue.clear();
        self.sum = 0.0;
        self.evictions_since_resum = 0;
    }

    fn window_len(&self, window: Option<usize>) -> Option<usize> {
        let n = window.map_or(self.readings.len(), |w| w.min(self.readings.len()));
        (n > 0).then_some(n)
    }

    fn tail(&self, n: usize) -> impl Iterator<Item = &Reading> {
        self.readings.iter().skip(self.readings.len() - n)
    }
}
