use resmon_core::{HistorySnapshot, RateReading, Reading, RunMetadata, Sample};
use serde::{Deserialize, Serialize};

/// Min / max / mean of one series over the readings that were available.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub min:     f64,
    pub max:     f64,
    pub avg:     f64,
    /// Readings that contributed.
    pub samples: usize,
}

impl SeriesStats {
    /// `None` when the series has no readings at all, so "not available" can
    /// never be mistaken for an average of zero.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut iter = values.into_iter().filter(|v| v.is_finite());
        let first = iter.next()?;
        let (mut min, mut max, mut sum, mut n) = (first, first, first, 1usize);
        for v in iter {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            n += 1;
        }
        Some(Self {
            min,
            max,
            avg: sum / n as f64,
            samples: n,
        })
    }
}

/// Count of ticks on which each probe could not be read.  Hardware that is
/// simply not present is not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableCounts {
    pub cpu:     usize,
    pub memory:  usize,
    pub disk:    usize,
    pub network: usize,
}

/// Derived statistics for a finished run.
///
/// A pure function of the snapshot: deriving it twice yields identical
/// values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub metadata:        RunMetadata,
    pub cpu_percent:     Option<SeriesStats>,
    pub cpu_temperature: Option<SeriesStats>,
    /// Rated ceiling of the first core, when the platform reports one.
    pub cpu_max_frequency_mhz: Option<u64>,
    pub memory_percent:  Option<SeriesStats>,
    /// Largest installed-memory figure seen during the run.
    pub memory_total_bytes: Option<u64>,
    pub swap_percent:    Option<SeriesStats>,
    pub disk_percent:    Option<SeriesStats>,
    pub disk_read_rate:  Option<SeriesStats>,
    pub disk_write_rate: Option<SeriesStats>,
    pub upload_rate:     Option<SeriesStats>,
    pub download_rate:   Option<SeriesStats>,
    pub gpu_percent:     Option<SeriesStats>,
    pub gpu_temperature: Option<SeriesStats>,
    /// Samples that carried a GPU reading.
    pub gpu_samples:     usize,
    pub unavailable:     UnavailableCounts,
    /// Rate readings forced to zero by a counter reset.
    pub discontinuities: usize,
}

impl RunSummary {
    pub fn from_snapshot(history: &HistorySnapshot) -> Self {
        let samples = history.samples();
        let series = |f: &dyn Fn(&Sample) -> Option<f64>| SeriesStats::from_values(samples.iter().filter_map(f));
        let unavailable = |f: &dyn Fn(&Sample) -> bool| samples.iter().filter(|s| f(s)).count();

        let rates = samples
            .iter()
            .flat_map(|s| {
                let net = s.network.available().map(|n| [n.upload, n.download]);
                let disk = s.disk.available().map(|d| [d.read_rate, d.write_rate]);
                net.into_iter().chain(disk).flatten()
            })
            .collect::<Vec<RateReading>>();

        Self {
            metadata:        history.metadata.clone(),
            cpu_percent:     series(&|s: &Sample| Some(f64::from(s.cpu.available()?.percent))),
            cpu_temperature: series(&|s: &Sample| s.cpu_temperature().map(f64::from)),
            cpu_max_frequency_mhz: samples
                .iter()
                .filter_map(|s| s.cpu.available()?.max_frequency_mhz)
                .max(),
            memory_percent:  series(&|s: &Sample| Some(f64::from(s.memory.available()?.percent))),
            memory_total_bytes: samples
                .iter()
                .filter_map(|s| s.memory.available().map(|m| m.total_bytes))
                .max(),
            swap_percent:    series(&|s: &Sample| s.memory.available()?.swap_percent.map(f64::from)),
            disk_percent:    series(&|s: &Sample| Some(f64::from(s.disk.available()?.percent))),
            disk_read_rate:  series(&|s: &Sample| s.disk.available()?.read_rate.bytes_per_sec()),
            disk_write_rate: series(&|s: &Sample| s.disk.available()?.write_rate.bytes_per_sec()),
            upload_rate:     series(&|s: &Sample| s.upload_rate()),
            download_rate:   series(&|s: &Sample| s.download_rate()),
            gpu_percent:     series(&|s: &Sample| Some(f64::from(s.gpu.as_ref()?.percent))),
            gpu_temperature: series(&|s: &Sample| s.gpu.as_ref()?.temperature.map(f64::from)),
            gpu_samples:     history.gpu_samples().count(),
            unavailable: UnavailableCounts {
                cpu:     unavailable(&|s: &Sample| is_unavailable(&s.cpu)),
                memory:  unavailable(&|s: &Sample| is_unavailable(&s.memory)),
                disk:    unavailable(&|s: &Sample| is_unavailable(&s.disk)),
                network: unavailable(&|s: &Sample| is_unavailable(&s.network)),
            },
            discontinuities: rates.iter().filter(|r| r.is_discontinuity()).count(),
        }
    }
}

fn is_unavailable<T>(reading: &Reading<T>) -> bool {
    matches!(reading, Reading::Unavailable(_))
}
