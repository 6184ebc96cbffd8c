//! Snapshot builders shared by the unit tests in this crate.

use chrono::{DateTime, TimeDelta, Utc};
use resmon_core::{
    CpuRecord, HistorySnapshot, HistoryStore, MemoryRecord, NetworkRecord, RateReading, Reading,
    RunEnd, RunMetadata, Sample,
};
use std::time::Duration;

/// A one-second-spaced sample.  `sent` is the upload counter; the rate is
/// measured against `prev_sent` one second earlier.
pub fn sample(index: u64, temperature: Option<f32>, sent: Option<u64>) -> Sample {
    let upload = match (index, sent) {
        (0, _) | (_, None) => RateReading::NoPriorSample,
        (_, Some(s)) => RateReading::Measured {
            bytes_per_sec: s as f64 / index as f64,
            discontinuity: false,
        },
    };
    Sample {
        index,
        timestamp: DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(index as i64),
        elapsed:   Duration::from_secs(index),
        cpu:       Reading::Available(CpuRecord::new(25.0, temperature).with_cores(8, Some(3_200))
                .with_max_frequency(Some(4_700))),
        memory:    Reading::Available(MemoryRecord::new(4 << 30, 16 << 30, 12 << 30, 0, 0)),
        disk:      Reading::NotPresent,
        network:   Reading::Available(NetworkRecord {
            upload,
            download: RateReading::NoPriorSample,
            bytes_sent_total: sent.unwrap_or(0),
            bytes_recv_total: 0,
            packets_sent_total: 0,
            packets_recv_total: 0,
            interfaces: 1,
        }),
        gpu:       None,
    }
}

pub fn snapshot(samples: Vec<Sample>) -> HistorySnapshot {
    let count = samples.len();
    let mut store = HistoryStore::new(count);
    for s in samples {
        store.push(s).expect("test samples are ordered");
    }
    store.into_snapshot(RunMetadata {
        start_time:    DateTime::<Utc>::UNIX_EPOCH,
        end_time:      DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(count as i64),
        sample_count:  count,
        ticks:         count as u64,
        evicted:       0,
        interval_secs: 1,
        duration_secs: count as u64,
        end:           RunEnd::Completed,
    })
}
