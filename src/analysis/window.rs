//! Bounded sliding window of timestamped samples

use std::collections::VecDeque;

/// Fixed-capacity FIFO of `(timestamp, payload)` pairs
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    entries: VecDeque<(f64, T)>,
    capacity: usize,
}

impl<T> SlidingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, returning the evicted oldest entry once full
    pub fn push(&mut self, timestamp: f64, payload: T) -> Option<(f64, T)> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back((timestamp, payload));
        evicted
    }

    pub fn latest(&self) -> Option<&(f64, T)> {
        self.entries.back()
    }

    pub fn oldest(&self) -> Option<&(f64, T)> {
        self.entries.front()
    }

    pub fn payloads(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|(_, payload)| payload)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
