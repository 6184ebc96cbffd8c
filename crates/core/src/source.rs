use crate::{error::Result, history::HistorySnapshot, sample::Reading};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Timing of the tick a probe is being asked to sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    /// Zero-based tick number.
    pub index:     u64,
    /// Monotonic time since run start.  Rate calculators difference against
    /// this, never against wall-clock time.
    pub elapsed:   Duration,
    /// Wall-clock time stamped onto the resulting sample.
    pub timestamp: DateTime<Utc>,
}

/// One probe per resource class.
///
/// Implementations must contain their own failures: a sensor that cannot be
/// read yields [`Reading::Unavailable`] (or [`Reading::NotPresent`] for
/// optional hardware) and the tick carries on.  Platform differences are
/// separate implementations selected at startup.
pub trait MetricSource: Send + std::fmt::Debug {
    type Record;

    /// Short identifier used in logs, e.g. `"cpu"` or `"network"`.
    fn id(&self) -> &'static str;

    /// Produce this tick's reading.
    fn sample(&mut self, tick: &TickContext) -> Reading<Self::Record>;
}

impl<S: MetricSource + ?Sized> MetricSource for Box<S> {
    type Record = S::Record;

    fn id(&self) -> &'static str {
        (**self).id()
    }

    fn sample(&mut self, tick: &TickContext) -> Reading<Self::Record> {
        (**self).sample(tick)
    }
}

/// Consumer of a finished run (charts, documents, files).
///
/// Receives the history exactly once, after sampling has stopped.
/// Implementations must tolerate unavailable fields and render a
/// placeholder instead of failing.
pub trait Reporter {
    fn report(&mut self, history: &HistorySnapshot) -> Result<()>;
}

/// Run two reporters in order; the second is skipped if the first fails.
impl<A: Reporter, B: Reporter> Reporter for (A, B) {
    fn report(&mut self, history: &HistorySnapshot) -> Result<()> {
        self.0.report(history)?;
        self.1.report(history)
    }
}
