use crate::error::MonitorError;
use crate::rate::RateReading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of one probe call for one tick.
///
/// Degraded readings are carried explicitly so a missing sensor can never be
/// confused with a legitimate zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Reading<T> {
    /// The probe produced a record.
    Available(T),
    /// The resource exists but could not be read this tick.
    Unavailable(String),
    /// Optional hardware that this host does not have.
    NotPresent,
}

impl<T> Reading<T> {
    #[must_use]
    pub fn available(&self) -> Option<&T> {
        match self {
            Self::Available(v) => Some(v),
            Self::Unavailable(_) | Self::NotPresent => None,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Self::Available(v)      => Reading::Available(f(v)),
            Self::Unavailable(why)  => Reading::Unavailable(why),
            Self::NotPresent        => Reading::NotPresent,
        }
    }

    /// Collapse into an `Option`, dropping the reason.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Available(v) => Some(v),
            Self::Unavailable(_) | Self::NotPresent => None,
        }
    }
}

impl<T> From<Result<T, MonitorError>> for Reading<T> {
    fn from(result: Result<T, MonitorError>) -> Self {
        match result {
            Ok(v) => Self::Available(v),
            Err(MonitorError::SensorUnavailable { reason, .. }) => Self::Unavailable(reason),
            Err(e) => Self::Unavailable(e.to_string()),
        }
    }
}

/// CPU utilisation for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuRecord {
    /// Average usage across all cores (0.0 – 100.0).
    pub percent: f32,
    /// Package temperature in °C, `None` when no sensor could be read.
    pub temperature: Option<f32>,
    /// Mirrors `temperature.is_some()`.
    pub temperature_available: bool,
    /// Logical core count.
    pub core_count: usize,
    /// Current frequency of the first core in MHz, when reported.
    pub frequency_mhz: Option<u64>,
    /// Highest frequency the first core can reach, when the platform says.
    pub max_frequency_mhz: Option<u64>,
}

impl CpuRecord {
    pub fn new(percent: f32, temperature: Option<f32>) -> Self {
        Self {
            percent: percent.clamp(0.0, 100.0),
            temperature,
            temperature_available: temperature.is_some(),
            core_count: 0,
            frequency_mhz: None,
            max_frequency_mhz: None,
        }
    }

    #[must_use]
    pub fn with_cores(mut self, core_count: usize, frequency_mhz: Option<u64>) -> Self {
        self.core_count = core_count;
        self.frequency_mhz = frequency_mhz;
        self
    }

    #[must_use]
    pub fn with_max_frequency(mut self, max_frequency_mhz: Option<u64>) -> Self {
        self.max_frequency_mhz = max_frequency_mhz;
        self
    }
}

/// Physical memory and swap usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub percent:         f32,
    pub used_bytes:      u64,
    pub total_bytes:     u64,
    pub available_bytes: u64,
    /// `None` when the host has no swap configured.
    pub swap_percent:    Option<f32>,
    pub swap_used_bytes:  u64,
    pub swap_total_bytes: u64,
}

impl MemoryRecord {
    pub fn new(used: u64, total: u64, available: u64, swap_used: u64, swap_total: u64) -> Self {
        Self {
            percent:          percent_of(used, total).unwrap_or(0.0),
            used_bytes:       used,
            total_bytes:      total,
            available_bytes:  available,
            swap_percent:     percent_of(swap_used, swap_total),
            swap_used_bytes:  swap_used,
            swap_total_bytes: swap_total,
        }
    }
}

/// Usage and I/O counters for the monitored mount point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskRecord {
    pub mount_point: String,
    pub percent:     f32,
    pub used_bytes:  u64,
    pub total_bytes: u64,
    /// Bytes read from the backing device since boot.
    pub read_bytes_total:  u64,
    /// Bytes written to the backing device since boot.
    pub write_bytes_total: u64,
    pub read_rate:  RateReading,
    pub write_rate: RateReading,
}

/// Interface totals summed across all interfaces, plus derived throughput.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub upload:   RateReading,
    pub download: RateReading,
    pub bytes_sent_total: u64,
    pub bytes_recv_total: u64,
    pub packets_sent_total: u64,
    pub packets_recv_total: u64,
    /// Number of interfaces that contributed to the totals.
    pub interfaces: usize,
}

/// First discoverable accelerator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuRecord {
    pub name:        String,
    pub percent:     f32,
    pub temperature: Option<f32>,
    pub memory_used_bytes:  Option<u64>,
    pub memory_total_bytes: Option<u64>,
}

/// One tick's complete, immutable snapshot of every resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Zero-based tick number within the run.
    pub index:     u64,
    /// Wall-clock collection time.  Derived from the run's start time plus a
    /// monotonic offset, so it never goes backwards within a run.
    pub timestamp: DateTime<Utc>,
    /// Monotonic time since the run started.
    pub elapsed:   Duration,
    pub cpu:     Reading<CpuRecord>,
    pub memory:  Reading<MemoryRecord>,
    pub disk:    Reading<DiskRecord>,
    pub network: Reading<NetworkRecord>,
    /// Absent when no accelerator was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu:     Option<GpuRecord>,
}

impl Sample {
    /// Upload rate, if one could be derived this tick.
    #[must_use]
    pub fn upload_rate(&self) -> Option<f64> {
        self.network.available()?.upload.bytes_per_sec()
    }

    /// Download rate, if one could be derived this tick.
    #[must_use]
    pub fn download_rate(&self) -> Option<f64> {
        self.network.available()?.download.bytes_per_sec()
    }

    #[must_use]
    pub fn cpu_temperature(&self) -> Option<f32> {
        self.cpu.available()?.temperature
    }
}

/// `part / whole` as a percentage, `None` when `whole` is zero.
#[must_use]
pub fn percent_of(part: u64, whole: u64) -> Option<f32> {
    if whole == 0 {
        return None;
    }
    Some((part as f64 / whole as f64 * 100.0) as f32)
}
