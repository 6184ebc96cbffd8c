use crate::schedule::TickSchedule;
use chrono::{DateTime, TimeDelta, Utc};
use resmon_config::RunPlan;
use resmon_core::{
    HistorySnapshot, HistoryStore, MonitorError, RunEnd, RunMetadata, Sample, TickContext,
};
use resmon_system::ProbeSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Lifecycle of a [`Sampler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// Configured, not yet started.
    Idle,
    /// Ticking.
    Running,
    /// Terminal; the history has been handed off.
    Finished,
}

/// Where a run stands after a sample has been stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Samples collected so far.
    pub collected:   u64,
    pub total_ticks: u64,
    pub elapsed:     Duration,
    pub duration:    Duration,
}

impl Progress {
    /// Completion in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.elapsed)
    }
}

/// Called after every stored sample.
pub type Observer = Box<dyn FnMut(&Sample, &Progress) + Send>;

/// Drives the probes at a fixed cadence and owns the history while running.
///
/// Single-threaded: one tick runs every probe in turn, then waits for the
/// next slot.  Cancellation is honoured only while waiting, so a sample is
/// either stored whole or not at all.
pub struct Sampler {
    interval: Duration,
    duration: Duration,
    schedule: TickSchedule,
    probes:   ProbeSet,
    history:  HistoryStore,
    state:    SamplerState,
    observer: Option<Observer>,
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("interval", &self.interval)
            .field("duration", &self.duration)
            .field("schedule", &self.schedule)
            .field("history_len", &self.history.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Sampler {
    pub fn new(plan: &RunPlan, probes: ProbeSet) -> Self {
        Self {
            interval: plan.interval,
            duration: plan.duration,
            schedule: TickSchedule::new(plan.interval, plan.total_ticks),
            probes,
            history:  HistoryStore::new(plan.history_capacity),
            state:    SamplerState::Idle,
            observer: None,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Run until the configured duration has elapsed or `shutdown`
    /// resolves, then hand back the frozen history.
    ///
    /// Probes block (sysinfo refreshes, `nvidia-smi`), so each tick's
    /// collection runs on tokio's blocking pool.
    pub async fn run<F: Future>(self, shutdown: F) -> HistorySnapshot {
        let Self {
            interval,
            duration,
            mut schedule,
            mut probes,
            mut history,
            mut state,
            mut observer,
        } = self;
        tokio::pin!(shutdown);

        let started = Instant::now();
        let start_time = Utc::now();
        transition(&mut state, SamplerState::Running);
        info!(
            "Sampling every {:?} for {:?} ({} ticks)",
            interval,
            duration,
            schedule.total_ticks()
        );

        let mut collected = 0u64;
        let mut end = RunEnd::Completed;

        while let Some(tick) = schedule.next_tick(started.elapsed()) {
            if tick.skipped > 0 {
                warn!("Probes ran late; skipped {} tick(s)", tick.skipped);
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    end = RunEnd::Cancelled;
                    break;
                }
                _ = sleep_until(started + tick.due) => {}
            }

            let elapsed = started.elapsed();
            let ctx = TickContext {
                index:     tick.index,
                elapsed,
                timestamp: wall_clock(start_time, elapsed),
            };
            let (returned, sample) = run_blocking(move || {
                let sample = probes.collect(&ctx);
                (probes, sample)
            })
            .await;
            probes = returned;
            debug!(tick = tick.index, elapsed = ?elapsed, "Sample collected");

            match history.push(sample) {
                Ok(_) => collected += 1,
                Err(e) => {
                    warn!("Dropping sample: {e}");
                    continue;
                }
            }

            if let (Some(observer), Some(latest)) = (observer.as_mut(), history.latest()) {
                let progress = Progress {
                    collected,
                    total_ticks: schedule.total_ticks(),
                    elapsed,
                    duration,
                };
                observer(latest, &progress);
            }
        }

        // Stay running until the full duration has passed.
        if end == RunEnd::Completed {
            tokio::select! {
                biased;
                _ = &mut shutdown => end = RunEnd::Cancelled,
                _ = sleep_until(started + duration) => {}
            }
        }
        if end == RunEnd::Cancelled {
            info!("{} after {collected} sample(s)", MonitorError::Cancelled);
        }

        let end_time = wall_clock(start_time, started.elapsed());
        transition(&mut state, SamplerState::Finished);

        let metadata = RunMetadata {
            start_time,
            end_time,
            sample_count:  history.len(),
            ticks:         collected,
            evicted:       history.evicted(),
            interval_secs: interval.as_secs(),
            duration_secs: duration.as_secs(),
            end,
        };
        info!(
            "Sampling finished: {} sample(s), {} evicted",
            metadata.sample_count, metadata.evicted
        );
        history.into_snapshot(metadata)
    }
}

fn transition(state: &mut SamplerState, next: SamplerState) {
    debug!("Sampler {state:?} -> {next:?}");
    *state = next;
}

/// Run blocking probe work off the async workers.  A panic inside `f` is
/// re-raised on the caller.
pub(crate) async fn run_blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => value,
        Err(e) => std::panic::resume_unwind(e.into_panic()),
    }
}

/// Wall-clock time that advances with the monotonic clock, so sample
/// timestamps stay ordered even if the system clock is adjusted mid-run.
fn wall_clock(start: DateTime<Utc>, elapsed: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(elapsed)
        .ok()
        .and_then(|delta| start.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
