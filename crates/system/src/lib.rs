pub mod counters;
pub mod cpu;
pub mod disk;
pub mod gpu;
pub mod memory;
pub mod network;

use resmon_core::{
    CpuRecord, DiskRecord, GpuRecord, MemoryRecord, MetricSource, NetworkRecord, Reading, Sample,
    TickContext,
};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub use cpu::CpuProbe;
pub use disk::DiskProbe;
pub use gpu::{NoGpu, NvidiaSmiProbe};
pub use memory::MemoryProbe;
pub use network::NetworkProbe;

pub type CpuSource     = Box<dyn MetricSource<Record = CpuRecord>>;
pub type MemorySource  = Box<dyn MetricSource<Record = MemoryRecord>>;
pub type DiskSource    = Box<dyn MetricSource<Record = DiskRecord>>;
pub type NetworkSource = Box<dyn MetricSource<Record = NetworkRecord>>;
pub type GpuSource     = Box<dyn MetricSource<Record = GpuRecord>>;

/// Which optional probes to build.
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    /// Mount point for the disk probe; `None` = platform root.
    pub disk_mount: Option<PathBuf>,
    /// Look for an accelerator.
    pub gpu: bool,
}

/// One probe per resource class, sampled together once per tick.
#[derive(Debug)]
pub struct ProbeSet {
    cpu:     CpuSource,
    memory:  MemorySource,
    disk:    DiskSource,
    network: NetworkSource,
    gpu:     GpuSource,
    /// Probes whose last reading was unavailable.
    degraded: HashSet<&'static str>,
}

impl ProbeSet {
    pub fn new(
        cpu: CpuSource,
        memory: MemorySource,
        disk: DiskSource,
        network: NetworkSource,
        gpu: GpuSource,
    ) -> Self {
        Self {
            cpu,
            memory,
            disk,
            network,
            gpu,
            degraded: HashSet::new(),
        }
    }

    /// Pick the implementation of each probe that this host supports.
    pub fn detect(options: &ProbeOptions) -> Self {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            warn!("sysinfo does not support this platform; most readings will be unavailable");
        }

        let gpu: GpuSource = match options.gpu.then(NvidiaSmiProbe::detect).flatten() {
            Some(probe) => Box::new(probe),
            None => {
                debug!("No GPU probe selected");
                Box::new(NoGpu)
            }
        };

        let disk = DiskProbe::new(options.disk_mount.clone());
        debug!("Tracking disk usage of '{}'", disk.mount().display());

        Self::new(
            Box::new(CpuProbe::detect()),
            Box::new(MemoryProbe::new()),
            Box::new(disk),
            Box::new(NetworkProbe::new()),
            gpu,
        )
    }

    /// Run every probe once and assemble the tick's sample.
    ///
    /// Never fails: each probe's degradation is recorded on its own field.
    pub fn collect(&mut self, tick: &TickContext) -> Sample {
        let cpu = self.cpu.sample(tick);
        track(&mut self.degraded, self.cpu.id(), &cpu);

        let memory = self.memory.sample(tick);
        track(&mut self.degraded, self.memory.id(), &memory);

        let disk = self.disk.sample(tick);
        track(&mut self.degraded, self.disk.id(), &disk);

        let network = self.network.sample(tick);
        track(&mut self.degraded, self.network.id(), &network);

        let gpu = self.gpu.sample(tick);
        track(&mut self.degraded, self.gpu.id(), &gpu);

        Sample {
            index: tick.index,
            timestamp: tick.timestamp,
            elapsed: tick.elapsed,
            cpu,
            memory,
            disk,
            network,
            gpu: gpu.into_option(),
        }
    }

    /// Identifiers of probes that are currently degraded.
    pub fn degraded(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.degraded.iter().copied()
    }
}

/// Warn on the first failure of a probe, stay quiet while it stays down,
/// and note when it comes back.
fn track<T>(degraded: &mut HashSet<&'static str>, probe: &'static str, reading: &Reading<T>) {
    match reading {
        Reading::Unavailable(reason) => {
            if degraded.insert(probe) {
                warn!(probe, "sensor unavailable: {reason}");
            } else {
                debug!(probe, "still unavailable: {reason}");
            }
        }
        Reading::Available(_) => {
            if degraded.remove(probe) {
                info!(probe, "sensor recovered");
            }
        }
        Reading::NotPresent => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resmon_core::RateReading;
    use std::time::Duration;

    /// Returns the same reading every tick.
    #[derive(Debug)]
    struct Fixed<T> {
        id:      &'static str,
        reading: Reading<T>,
    }

    impl<T: Clone + Send + std::fmt::Debug> MetricSource for Fixed<T> {
        type Record = T;

        fn id(&self) -> &'static str {
            self.id
        }

        fn sample(&mut self, _tick: &TickContext) -> Reading<T> {
            self.reading.clone()
        }
    }

    fn fixed<T>(id: &'static str, reading: Reading<T>) -> Box<Fixed<T>> {
        Box::new(Fixed { id, reading })
    }

    fn probes(disk: Reading<DiskRecord>, gpu: Reading<GpuRecord>) -> ProbeSet {
        ProbeSet::new(
            fixed("cpu", Reading::Available(CpuRecord::new(20.0, None))),
            fixed("memory", Reading::Available(MemoryRecord::new(1, 2, 1, 0, 0))),
            fixed("disk", disk),
            fixed(
                "network",
                Reading::Available(NetworkRecord {
                    upload:   RateReading::NoPriorSample,
                    download: RateReading::NoPriorSample,
                    bytes_sent_total:   0,
                    bytes_recv_total:   0,
                    packets_sent_total: 0,
                    packets_recv_total: 0,
                    interfaces:         1,
                }),
            ),
            fixed("gpu", gpu),
        )
    }

    fn tick(index: u64) -> TickContext {
        TickContext {
            index,
            elapsed: Duration::from_secs(index),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn missing_gpu_is_omitted() {
        let mut set = probes(Reading::Unavailable("x".into()), Reading::NotPresent);
        let sample = set.collect(&tick(0));
        assert!(sample.gpu.is_none());
        assert!(sample.cpu.is_available());
    }

    #[test]
    fn failing_gpu_is_omitted_and_tracked() {
        let mut set = probes(Reading::NotPresent, Reading::Unavailable("driver".into()));
        let sample = set.collect(&tick(0));
        assert!(sample.gpu.is_none());
        assert_eq!(set.degraded().collect::<Vec<_>>(), vec!["gpu"]);
    }

    #[test]
    fn unavailable_disk_does_not_abort_tick() {
        let mut set = probes(Reading::Unavailable("no volume".into()), Reading::NotPresent);
        let sample = set.collect(&tick(4));
        assert_eq!(sample.index, 4);
        assert_eq!(sample.disk, Reading::Unavailable("no volume".into()));
        assert!(sample.memory.is_available());
        assert!(sample.network.is_available());
    }

    #[test]
    fn track_clears_on_recovery() {
        let mut degraded = HashSet::new();
        track::<u8>(&mut degraded, "disk", &Reading::Unavailable("gone".into()));
        track::<u8>(&mut degraded, "disk", &Reading::Unavailable("gone".into()));
        assert!(degraded.contains("disk"));
        track(&mut degraded, "disk", &Reading::Available(1u8));
        assert!(degraded.is_empty());
    }
}
