//! Bounded cache of gait metrics awaiting bulk upload

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analysis::GaitMetrics;

/// Gait metrics stamped with the wall-clock time they were produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub metrics: GaitMetrics,
}

/// FIFO of pending upload records.
///
/// Holds at most `capacity` records; once full the oldest record is dropped.
/// Consecutive identical metrics (the analyzer repeats its last state between
/// steps) are stored once.
pub struct MetricsCache {
    records: VecDeque<UploadRecord>,
    capacity: usize,
    last: Option<GaitMetrics>,
    dropped: u64,
}

impl MetricsCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            last: None,
            dropped: 0,
        }
    }

    /// Returns `false` when the metrics repeat the previous entry
    pub fn push(&mut self, metrics: GaitMetrics, recorded_at: DateTime<Utc>) -> bool {
        if self.last.as_ref() == Some(&metrics) {
            return false;
        }
        self.last = Some(metrics.clone());

        if self.records.len() == self.capacity {
            self.records.pop_front();
            self.dropped += 1;
            if self.dropped == 1 || self.dropped % 1000 == 0 {
                warn!("Metrics cache full, {} records dropped so far", self.dropped);
            }
        }
        self.records.push_back(UploadRecord { recorded_at, metrics });
        true
    }

    /// Hand out every pending record and clear the cache
    pub fn drain(&mut self) -> Vec<UploadRecord> {
        self.records.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
