use resmon_config::MonitorConfig;
use resmon_core::{
    CpuRecord, HistorySnapshot, MemoryRecord, MetricSource, MonitorError, Reading, Reporter,
    Result, RunEnd, Sample, TickContext,
};
use resmon_sampler::{Pipeline, Progress, Sampler, SamplerState};
use resmon_system::disk::{VolumeStats, VolumeTotals};
use resmon_system::network::{InterfaceCounters, InterfaceTotals};
use resmon_system::{DiskProbe, NetworkProbe, NoGpu, ProbeSet};
use std::future::pending;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fakes ─────────────────────────────────────────────────────────────────────

/// CPU without a temperature sensor.
#[derive(Debug)]
struct ColdCpu;

impl MetricSource for ColdCpu {
    type Record = CpuRecord;

    fn id(&self) -> &'static str {
        "cpu"
    }

    fn sample(&mut self, tick: &TickContext) -> Reading<CpuRecord> {
        Reading::Available(CpuRecord::new(10.0 + tick.index as f32, None).with_cores(4, None))
    }
}

#[derive(Debug)]
struct SteadyMemory;

impl MetricSource for SteadyMemory {
    type Record = MemoryRecord;

    fn id(&self) -> &'static str {
        "memory"
    }

    fn sample(&mut self, _tick: &TickContext) -> Reading<MemoryRecord> {
        Reading::Available(MemoryRecord::new(4 << 30, 16 << 30, 12 << 30, 0, 0))
    }
}

/// Replays sent-byte totals; repeats the last value once exhausted.
#[derive(Debug)]
struct SentCounter {
    values: Vec<u64>,
    next:   usize,
}

impl SentCounter {
    fn new(values: &[u64]) -> Self {
        Self {
            values: values.to_vec(),
            next:   0,
        }
    }
}

impl InterfaceCounters for SentCounter {
    fn read(&mut self) -> Result<InterfaceTotals> {
        let idx = self.next.min(self.values.len() - 1);
        self.next += 1;
        Ok(InterfaceTotals {
            bytes_sent: self.values[idx],
            bytes_recv: 10_000 * self.next as u64,
            interfaces: 2,
            ..InterfaceTotals::default()
        })
    }
}

#[derive(Debug)]
struct MissingVolume;

impl VolumeStats for MissingVolume {
    fn read(&mut self, path: &Path) -> Result<VolumeTotals> {
        Err(MonitorError::sensor("disk", format!("no volume mounted at '{}'", path.display())))
    }
}

fn probes(sent: &[u64]) -> ProbeSet {
    ProbeSet::new(
        Box::new(ColdCpu),
        Box::new(SteadyMemory),
        Box::new(DiskProbe::with_volumes(MissingVolume, PathBuf::from("/data"))),
        Box::new(NetworkProbe::with_counters(SentCounter::new(sent))),
        Box::new(NoGpu),
    )
}

/// Keeps every snapshot it is handed.
#[derive(Debug, Default, Clone)]
struct Recorder {
    calls: Arc<Mutex<Vec<HistorySnapshot>>>,
}

impl Recorder {
    fn snapshots(&self) -> Vec<HistorySnapshot> {
        self.calls.lock().unwrap().clone()
    }
}

impl Reporter for Recorder {
    fn report(&mut self, history: &HistorySnapshot) -> Result<()> {
        self.calls.lock().unwrap().push(history.clone());
        Ok(())
    }
}

fn config(duration_secs: u64, interval_secs: u64) -> MonitorConfig {
    MonitorConfig {
        duration_secs,
        interval_secs,
        gpu: false,
        ..MonitorConfig::default()
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn five_second_interval_over_twenty_seconds() {
    let mut recorder = Recorder::default();
    let meta = Pipeline::new(&config(20, 5))
        .unwrap()
        .run_with(probes(&[100, 600, 1_100, 2_100]), pending::<()>(), &mut recorder)
        .await
        .unwrap();

    assert_eq!(meta.sample_count, 4);
    assert_eq!(meta.end, RunEnd::Completed);
    assert!(meta.end_time > meta.start_time);

    let snapshots = recorder.snapshots();
    assert_eq!(snapshots.len(), 1, "reporter must be called exactly once");
    let samples = snapshots[0].samples();

    assert_eq!(samples[0].upload_rate(), None);
    assert_eq!(samples[0].download_rate(), None);
    for s in &samples[1..] {
        assert!(s.upload_rate().unwrap() >= 0.0);
        assert!(s.download_rate().unwrap() >= 0.0);
    }
    assert_eq!(samples[1].upload_rate(), Some(100.0));
    assert_eq!(samples[3].upload_rate(), Some(200.0));

    let offsets: Vec<_> = samples.iter().map(|s| s.elapsed.as_secs()).collect();
    assert_eq!(offsets, vec![0, 5, 10, 15]);
    assert!(samples.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[tokio::test(start_paused = true)]
async fn counter_reset_reports_zero_with_discontinuity() {
    let mut recorder = Recorder::default();
    Pipeline::new(&config(3, 1))
        .unwrap()
        .run_with(probes(&[1_000, 1_500, 1_200]), pending::<()>(), &mut recorder)
        .await
        .unwrap();

    let snapshot = &recorder.snapshots()[0];
    let uploads: Vec<_> = snapshot
        .samples()
        .iter()
        .map(|s| s.network.available().unwrap().upload)
        .collect();

    assert!(!uploads[0].is_available());
    assert_eq!(uploads[1].bytes_per_sec(), Some(500.0));
    assert_eq!(uploads[2].bytes_per_sec(), Some(0.0));
    assert!(uploads[2].is_discontinuity());
}

#[tokio::test(start_paused = true)]
async fn degraded_sensors_never_stop_the_run() {
    let mut recorder = Recorder::default();
    Pipeline::new(&config(10, 2))
        .unwrap()
        .run_with(probes(&[0]), pending::<()>(), &mut recorder)
        .await
        .unwrap();

    let snapshot = &recorder.snapshots()[0];
    assert_eq!(snapshot.len(), 5);
    assert_eq!(snapshot.gpu_samples().count(), 0);
    for s in snapshot.samples() {
        assert!(s.gpu.is_none());
        assert!(!s.cpu.available().unwrap().temperature_available);
        assert!(matches!(&s.disk, Reading::Unavailable(reason) if reason.contains("/data")));
        assert!(s.memory.is_available());
    }
}

#[tokio::test(start_paused = true)]
async fn cancellation_keeps_collected_samples() {
    let mut recorder = Recorder::default();
    let meta = Pipeline::new(&config(60, 5))
        .unwrap()
        .run_with(
            probes(&[0]),
            tokio::time::sleep(Duration::from_secs(7)),
            &mut recorder,
        )
        .await
        .unwrap();

    assert_eq!(meta.end, RunEnd::Cancelled);
    assert_eq!(meta.sample_count, 2);
    assert_eq!(recorder.snapshots().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_before_first_tick_hands_empty_history() {
    let mut recorder = Recorder::default();
    let meta = Pipeline::new(&config(20, 5))
        .unwrap()
        .run_with(probes(&[0]), std::future::ready(()), &mut recorder)
        .await
        .unwrap();

    assert_eq!(meta.end, RunEnd::Cancelled);
    assert_eq!(meta.sample_count, 0);
    assert!(recorder.snapshots()[0].is_empty());
}

#[tokio::test(start_paused = true)]
async fn history_is_bounded_by_capacity() {
    let mut cfg = config(100, 1);
    cfg.history_capacity = 8;
    let plan = cfg.validate().unwrap();

    let sampler = Sampler::new(&plan, probes(&[0]));
    assert_eq!(sampler.state(), SamplerState::Idle);
    let snapshot = sampler.run(pending::<()>()).await;

    assert_eq!(snapshot.len(), 8);
    assert_eq!(snapshot.metadata.ticks, 100);
    assert_eq!(snapshot.metadata.evicted, 92);
    assert_eq!(snapshot.samples()[0].index, 92);
}

#[tokio::test(start_paused = true)]
async fn observer_sees_every_sample() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut recorder = Recorder::default();
    Pipeline::new(&config(20, 5))
        .unwrap()
        .with_observer(Box::new(move |sample: &Sample, progress: &Progress| {
            sink.lock().unwrap().push((sample.index, progress.collected));
        }))
        .run_with(probes(&[0]), pending::<()>(), &mut recorder)
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![(0, 1), (1, 2), (2, 3), (3, 4)]);
}

#[test]
fn invalid_configuration_fails_before_sampling() {
    let err = Pipeline::new(&config(10, 20)).unwrap_err();
    assert!(matches!(err, MonitorError::Configuration(_)));
    assert!(err.is_fatal());

    let mut cfg = config(20, 5);
    cfg.output_dir = PathBuf::new();
    assert!(Pipeline::new(&cfg).is_err());
}
