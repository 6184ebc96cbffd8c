use thiserror::Error;

/// Top-level error type used across the entire application.
///
/// Only [`MonitorError::Configuration`] is fatal to a run.  Every other
/// variant describes a condition that is contained at the probe or tick
/// boundary and surfaces as an availability marker on the affected sample.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("sensor unavailable ({probe}): {reason}")]
    SensorUnavailable { probe: &'static str, reason: String },

    #[error("invalid interval: {elapsed_secs}s between counter readings")]
    InvalidInterval { elapsed_secs: f64 },

    #[error("counter discontinuity: {previous} -> {current}")]
    CounterDiscontinuity { previous: u64, current: u64 },

    #[error("run cancelled")]
    Cancelled,

    #[error("sample out of order: tick {index} is not newer than the last stored sample")]
    OutOfOrder { index: u64 },

    #[error("report error: {0}")]
    Report(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl MonitorError {
    /// Shorthand for a probe-level [`MonitorError::SensorUnavailable`].
    pub fn sensor(probe: &'static str, reason: impl Into<String>) -> Self {
        Self::SensorUnavailable {
            probe,
            reason: reason.into(),
        }
    }

    /// `true` for the one class of error that must abort the process.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
