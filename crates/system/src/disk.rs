use crate::counters::CounterPair;
use resmon_core::{DiskRecord, MetricSource, MonitorError, Reading, Result, TickContext};
use std::path::{Path, PathBuf};
use sysinfo::Disks;

/// Raw figures for one volume at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeTotals {
    /// Mount point that actually backs the requested path.
    pub mount_point: PathBuf,
    pub total_bytes:     u64,
    pub available_bytes: u64,
    pub read_bytes:      u64,
    pub written_bytes:   u64,
}

/// Where volume figures come from.
pub trait VolumeStats: Send + std::fmt::Debug {
    fn read(&mut self, path: &Path) -> Result<VolumeTotals>;
}

/// Mounted filesystems as listed by sysinfo.
#[derive(Debug)]
pub struct SysinfoVolumes {
    disks: Disks,
}

impl SysinfoVolumes {
    pub fn new() -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoVolumes {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeStats for SysinfoVolumes {
    fn read(&mut self, path: &Path) -> Result<VolumeTotals> {
        self.disks.refresh(true);
        let index = longest_mount_prefix(self.disks.iter().map(|d| d.mount_point()), path)
            .ok_or_else(|| {
                MonitorError::sensor("disk", format!("no volume mounted at '{}'", path.display()))
            })?;
        let disk = &self.disks.list()[index];
        let usage = disk.usage();

        Ok(VolumeTotals {
            mount_point:     disk.mount_point().to_path_buf(),
            total_bytes:     disk.total_space(),
            available_bytes: disk.available_space(),
            read_bytes:      usage.total_read_bytes,
            written_bytes:   usage.total_written_bytes,
        })
    }
}

/// Index of the mount point that contains `path` most specifically.
fn longest_mount_prefix<'a>(mounts: impl Iterator<Item = &'a Path>, path: &Path) -> Option<usize> {
    mounts
        .enumerate()
        .filter(|(_, mount)| path.starts_with(mount))
        .max_by_key(|(_, mount)| mount.components().count())
        .map(|(i, _)| i)
}

/// The platform's root volume.
pub fn default_mount() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:\\")
    } else {
        PathBuf::from("/")
    }
}

/// Usage of one mount point plus read/write throughput of its device.
#[derive(Debug)]
pub struct DiskProbe<V = SysinfoVolumes> {
    volumes:  V,
    mount:    PathBuf,
    counters: CounterPair,
}

impl DiskProbe {
    /// `mount` of `None` tracks the platform root volume.
    pub fn new(mount: Option<PathBuf>) -> Self {
        Self::with_volumes(SysinfoVolumes::new(), mount.unwrap_or_else(default_mount))
    }
}

impl<V: VolumeStats> DiskProbe<V> {
    pub fn with_volumes(volumes: V, mount: PathBuf) -> Self {
        Self {
            volumes,
            mount,
            counters: CounterPair::default(),
        }
    }

    pub fn mount(&self) -> &Path {
        &self.mount
    }
}

impl<V: VolumeStats> MetricSource for DiskProbe<V> {
    type Record = DiskRecord;

    fn id(&self) -> &'static str {
        "disk"
    }

    fn sample(&mut self, tick: &TickContext) -> Reading<DiskRecord> {
        let totals = match self.volumes.read(&self.mount) {
            Ok(t) => t,
            Err(e) => return Reading::from(Err::<DiskRecord, _>(e)),
        };
        if totals.total_bytes == 0 {
            return Reading::Unavailable(format!(
                "volume at '{}' reports zero capacity",
                totals.mount_point.display()
            ));
        }

        let used = totals.total_bytes.saturating_sub(totals.available_bytes);
        let (read_rate, write_rate) =
            self.counters
                .observe(totals.read_bytes, totals.written_bytes, tick.elapsed);

        Reading::Available(DiskRecord {
            mount_point: totals.mount_point.display().to_string(),
            percent: resmon_core::sample::percent_of(used, totals.total_bytes).unwrap_or(0.0),
            used_bytes: used,
            total_bytes: totals.total_bytes,
            read_bytes_total: totals.read_bytes,
            write_bytes_total: totals.written_bytes,
            read_rate,
            write_rate,
        })
    }
}
