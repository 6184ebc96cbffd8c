use crate::error::{MonitorError, Result};
use crate::sample::Sample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Upper bound on the room reserved up front; the buffer grows past it on
/// demand until `capacity` is reached.
const PREALLOCATE: usize = 256;

/// Bounded, append-only history of samples.
///
/// Once `capacity` samples are held, each push evicts the oldest one, so
/// memory stays O(capacity) however long the run is.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    samples:  VecDeque<Sample>,
    capacity: usize,
    evicted:  u64,
}

impl HistoryStore {
    /// A zero capacity is bumped to one so the store can always hold the
    /// latest sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(PREALLOCATE)),
            capacity,
            evicted: 0,
        }
    }

    /// Append a sample, returning the evicted one if the store was full.
    ///
    /// Rejects samples whose timestamp is not strictly newer than the last
    /// stored one; the store never reorders.
    pub fn push(&mut self, sample: Sample) -> Result<Option<Sample>> {
        if let Some(last) = self.samples.back() {
            if sample.timestamp <= last.timestamp {
                return Err(MonitorError::OutOfOrder { index: sample.index });
            }
        }

        let evicted = if self.samples.len() == self.capacity {
            self.evicted += 1;
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        Ok(evicted)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples dropped to make room since the store was created.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Freeze the store into the read-only form handed to reporters.
    pub fn into_snapshot(self, meta: RunMetadata) -> HistorySnapshot {
        HistorySnapshot {
            metadata: meta,
            samples:  self.samples.into(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEnd {
    /// The configured duration elapsed.
    Completed,
    /// Interrupted from outside between ticks.
    Cancelled,
}

/// Run-level facts that travel with the samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub start_time:    DateTime<Utc>,
    pub end_time:      DateTime<Utc>,
    /// Samples present in the snapshot.
    pub sample_count:  usize,
    /// Samples collected over the run, including evicted ones.
    pub ticks:         u64,
    pub evicted:       u64,
    pub interval_secs: u64,
    pub duration_secs: u64,
    pub end:           RunEnd,
}

/// Read-only history handed from the sampler to a [`crate::Reporter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub metadata: RunMetadata,
    samples:      Vec<Sample>,
}

impl HistorySnapshot {
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples that carry a GPU reading.
    pub fn gpu_samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter().filter(|s| s.gpu.is_some())
    }
}
