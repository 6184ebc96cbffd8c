//! Cumulative-counter differencing.
//!
//! OS network and disk counters are running totals.  A rate only exists
//! between two readings, so the very first reading of a run yields
//! [`RateReading::NoPriorSample`] instead of a number.

use crate::error::MonitorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Why two counter readings could not be turned into a plain rate.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RateError {
    #[error("elapsed time {elapsed_secs}s is not positive")]
    InvalidInterval { elapsed_secs: f64 },

    #[error("counter went backwards: {previous} -> {current}")]
    CounterDiscontinuity { previous: u64, current: u64 },
}

impl From<RateError> for MonitorError {
    fn from(err: RateError) -> Self {
        match err {
            RateError::InvalidInterval { elapsed_secs } => Self::InvalidInterval { elapsed_secs },
            RateError::CounterDiscontinuity { previous, current } => {
                Self::CounterDiscontinuity { previous, current }
            }
        }
    }
}

/// Bytes per second between two cumulative readings.
///
/// `prev_time` and `curr_time` are offsets on the same monotonic clock
/// (the sampler uses time since run start).  The result is never rounded.
pub fn compute_rate(
    prev_counter: u64,
    prev_time: Duration,
    curr_counter: u64,
    curr_time: Duration,
) -> Result<f64, RateError> {
    let elapsed_secs = curr_time.as_secs_f64() - prev_time.as_secs_f64();
    if elapsed_secs <= 0.0 {
        return Err(RateError::InvalidInterval { elapsed_secs });
    }
    if curr_counter < prev_counter {
        return Err(RateError::CounterDiscontinuity {
            previous: prev_counter,
            current:  curr_counter,
        });
    }
    Ok((curr_counter - prev_counter) as f64 / elapsed_secs)
}

/// Outcome of one rate observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RateReading {
    /// First reading of the run; nothing to difference against.
    NoPriorSample,
    /// The clock did not advance between readings.
    InvalidInterval,
    /// A real rate.  `discontinuity` is set when the counter reset and the
    /// rate was forced to zero for this tick.
    Measured { bytes_per_sec: f64, discontinuity: bool },
}

impl RateReading {
    /// The rate, or `None` when no rate could be derived this tick.
    #[must_use]
    pub fn bytes_per_sec(&self) -> Option<f64> {
        match self {
            Self::Measured { bytes_per_sec, .. } => Some(*bytes_per_sec),
            Self::NoPriorSample | Self::InvalidInterval => None,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.bytes_per_sec().is_some()
    }

    #[must_use]
    pub fn is_discontinuity(&self) -> bool {
        matches!(self, Self::Measured { discontinuity: true, .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct CounterSnapshot {
    counter: u64,
    at:      Duration,
}

/// Remembers the previous reading of one cumulative counter.
#[derive(Debug, Clone, Default)]
pub struct RateCalculator {
    last: Option<CounterSnapshot>,
}

impl RateCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the counter value observed at `at` and get this tick's rate.
    ///
    /// On a counter reset the new value becomes the baseline.  On a clock
    /// anomaly the older baseline is kept so the next tick can still be
    /// measured against it.
    pub fn observe(&mut self, counter: u64, at: Duration) -> RateReading {
        let current = CounterSnapshot { counter, at };
        let Some(prev) = self.last else {
            self.last = Some(current);
            return RateReading::NoPriorSample;
        };

        match compute_rate(prev.counter, prev.at, counter, at) {
            Ok(bytes_per_sec) => {
                self.last = Some(current);
                RateReading::Measured {
                    bytes_per_sec,
                    discontinuity: false,
                }
            }
            Err(err @ RateError::CounterDiscontinuity { .. }) => {
                tracing::debug!("{err}; reporting zero rate");
                self.last = Some(current);
                RateReading::Measured {
                    bytes_per_sec: 0.0,
                    discontinuity: true,
                }
            }
            Err(err @ RateError::InvalidInterval { .. }) => {
                tracing::debug!("{err}; no rate this tick");
                RateReading::InvalidInterval
            }
        }
    }

    /// Forget the baseline; the next observation is treated as the first.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn compute_rate_divides_by_elapsed() {
        let rate = compute_rate(1_000, secs(0), 4_000, secs(2)).unwrap();
        assert_eq!(rate, 1_500.0);
    }

    #[test]
    fn compute_rate_is_not_rounded() {
        let rate = compute_rate(0, secs(0), 1_000, secs(3)).unwrap();
        assert!((rate - 1_000.0 / 3.0).abs() < 1e-9);
        assert_ne!(rate, rate.round());
    }

    #[test]
    fn compute_rate_rejects_non_positive_interval() {
        assert!(matches!(
            compute_rate(0, secs(5), 10, secs(5)),
            Err(RateError::InvalidInterval { .. })
        ));
        assert!(matches!(
            compute_rate(0, secs(5), 10, secs(4)),
            Err(RateError::InvalidInterval { elapsed_secs }) if elapsed_secs < 0.0
        ));
    }

    #[test]
    fn compute_rate_flags_counter_decrease() {
        assert_eq!(
            compute_rate(1_500, secs(1), 1_200, secs(2)),
            Err(RateError::CounterDiscontinuity {
                previous: 1_500,
                current:  1_200,
            })
        );
    }

    #[test]
    fn calculator_counter_sequence() {
        let mut calc = RateCalculator::new();
        let readings: Vec<_> = [1_000, 1_500, 1_200]
            .into_iter()
            .enumerate()
            .map(|(i, c)| calc.observe(c, secs(i as u64)))
            .collect();

        assert_eq!(readings[0], RateReading::NoPriorSample);
        assert_eq!(readings[0].bytes_per_sec(), None);
        assert_eq!(
            readings[1],
            RateReading::Measured {
                bytes_per_sec: 500.0,
                discontinuity: false,
            }
        );
        assert_eq!(readings[2].bytes_per_sec(), Some(0.0));
        assert!(readings[2].is_discontinuity());
    }

    #[test]
    fn calculator_rebases_after_reset() {
        let mut calc = RateCalculator::new();
        calc.observe(1_000, secs(0));
        calc.observe(200, secs(1));
        assert_eq!(calc.observe(700, secs(2)).bytes_per_sec(), Some(500.0));
    }

    #[test]
    fn calculator_keeps_baseline_on_clock_anomaly() {
        let mut calc = RateCalculator::new();
        calc.observe(1_000, secs(2));
        assert_eq!(calc.observe(1_100, secs(2)), RateReading::InvalidInterval);
        assert_eq!(calc.observe(1_400, secs(4)).bytes_per_sec(), Some(200.0));
    }

    #[test]
    fn calculator_reset_forgets_baseline() {
        let mut calc = RateCalculator::new();
        calc.observe(1_000, secs(0));
        calc.reset();
        assert_eq!(calc.observe(2_000, secs(1)), RateReading::NoPriorSample);
    }

    #[test]
    fn zero_traffic_is_distinct_from_no_prior_sample() {
        let mut calc = RateCalculator::new();
        let first = calc.observe(10, secs(0));
        let idle = calc.observe(10, secs(1));
        assert!(!first.is_available());
        assert_eq!(idle.bytes_per_sec(), Some(0.0));
        assert!(!idle.is_discontinuity());
    }

    #[test]
    fn rate_error_maps_into_monitor_error() {
        let err: MonitorError = RateError::CounterDiscontinuity {
            previous: 2,
            current:  1,
        }
        .into();
        assert!(matches!(err, MonitorError::CounterDiscontinuity { previous: 2, current: 1 }));
        assert!(!err.is_fatal());
    }
}
