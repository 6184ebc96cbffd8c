use resmon_core::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Ceiling on `limits.max_duration_secs` (7 days), whatever the file says.
pub const HARD_MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;
/// Ceiling on `limits.max_samples`.
pub const HARD_MAX_SAMPLES: u64 = 1_000_000;

/// Root configuration structure parsed from `resmon.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Total run length in seconds.
    pub duration_secs: u64,
    /// Time between ticks in seconds.
    pub interval_secs: u64,
    /// Directory that receives the report files.
    pub output_dir: PathBuf,
    /// Mount point whose usage is tracked.  `None` = platform root volume.
    pub disk_mount: Option<PathBuf>,
    /// Probe for an accelerator at all.
    pub gpu: bool,
    /// Maximum number of samples kept in memory.
    pub history_capacity: usize,
    /// Upper bounds applied during validation.
    pub limits: Limits,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            duration_secs:    300,
            interval_secs:    5,
            output_dir:       PathBuf::from("output"),
            disk_mount:       None,
            gpu:              true,
            history_capacity: 4_096,
            limits:           Limits::default(),
        }
    }
}

/// Upper bounds that keep the worst-case run size finite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_duration_secs: u64,
    /// Largest `duration / interval` accepted.
    pub max_samples: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_duration_secs: 24 * 60 * 60,
            max_samples:       100_000,
        }
    }
}

/// A validated configuration, ready to drive a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub duration:         Duration,
    pub interval:         Duration,
    /// `floor(duration / interval)`.
    pub total_ticks:      u64,
    pub output_dir:       PathBuf,
    pub disk_mount:       Option<PathBuf>,
    pub gpu:              bool,
    /// Configured capacity, trimmed to `total_ticks`.
    pub history_capacity: usize,
}

impl MonitorConfig {
    /// Check every bound and produce a [`RunPlan`].
    ///
    /// Fails with [`MonitorError::Configuration`] before any sampling starts.
    pub fn validate(&self) -> Result<RunPlan> {
        let invalid = |msg: String| Err(MonitorError::Configuration(msg));

        if self.duration_secs == 0 {
            return invalid("duration must be greater than 0".into());
        }
        if self.interval_secs == 0 {
            return invalid("interval must be greater than 0".into());
        }
        if self.interval_secs > self.duration_secs {
            return invalid(format!(
                "interval ({}s) cannot be greater than duration ({}s)",
                self.interval_secs, self.duration_secs
            ));
        }

        let max_duration = self.limits.max_duration_secs.min(HARD_MAX_DURATION_SECS);
        if self.duration_secs > max_duration {
            return invalid(format!(
                "duration ({}s) exceeds the limit of {max_duration}s",
                self.duration_secs
            ));
        }

        let total_ticks = self.duration_secs / self.interval_secs;
        let max_samples = self.limits.max_samples.min(HARD_MAX_SAMPLES);
        if total_ticks > max_samples {
            return invalid(format!(
                "{total_ticks} samples requested; the limit is {max_samples} (raise the interval)"
            ));
        }

        if self.output_dir.as_os_str().to_string_lossy().trim().is_empty() {
            return invalid("output directory must not be empty".into());
        }
        if let Some(mount) = &self.disk_mount {
            if mount.as_os_str().is_empty() {
                return invalid("disk mount point must not be empty".into());
            }
        }
        if self.history_capacity == 0 {
            return invalid("history capacity must be greater than 0".into());
        }
        if self.history_capacity as u64 > HARD_MAX_SAMPLES {
            return invalid(format!(
                "history capacity ({}) exceeds the limit of {HARD_MAX_SAMPLES}",
                self.history_capacity
            ));
        }

        Ok(RunPlan {
            duration: Duration::from_secs(self.duration_secs),
            interval: Duration::from_secs(self.interval_secs),
            total_ticks,
            output_dir: self.output_dir.clone(),
            disk_mount: self.disk_mount.clone(),
            gpu: self.gpu,
            // Never more than the run can produce.
            history_capacity: self.history_capacity.min(total_ticks as usize),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(duration_secs: u64, interval_secs: u64) -> MonitorConfig {
        MonitorConfig {
            duration_secs,
            interval_secs,
            ..MonitorConfig::default()
        }
    }

    fn rejected(cfg: &MonitorConfig) -> bool {
        matches!(cfg.validate(), Err(MonitorError::Configuration(_)))
    }

    #[test]
    fn defaults_are_valid() {
        let plan = MonitorConfig::default().validate().unwrap();
        assert_eq!(plan.total_ticks, 60);
        assert_eq!(plan.interval, Duration::from_secs(5));
    }

    #[test]
    fn tick_count_is_floor_of_ratio() {
        assert_eq!(config(20, 5).validate().unwrap().total_ticks, 4);
        assert_eq!(config(22, 5).validate().unwrap().total_ticks, 4);
        assert_eq!(config(5, 5).validate().unwrap().total_ticks, 1);
    }

    #[test]
    fn rejects_zero_values() {
        assert!(rejected(&config(0, 5)));
        assert!(rejected(&config(20, 0)));
    }

    #[test]
    fn rejects_interval_longer_than_duration() {
        assert!(rejected(&config(10, 11)));
    }

    #[test]
    fn rejects_durations_over_the_limit() {
        assert!(rejected(&config(24 * 60 * 60 + 1, 60)));
    }

    #[test]
    fn configured_limits_cannot_exceed_hard_ceiling() {
        let mut cfg = config(HARD_MAX_DURATION_SECS + 60, 60);
        cfg.limits.max_duration_secs = u64::MAX;
        assert!(rejected(&cfg));
    }

    #[test]
    fn rejects_too_many_samples() {
        let mut cfg = config(1_000, 1);
        cfg.limits.max_samples = 999;
        assert!(rejected(&cfg));
        cfg.limits.max_samples = 1_000;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_empty_output_target() {
        let mut cfg = config(20, 5);
        cfg.output_dir = PathBuf::from("  ");
        assert!(rejected(&cfg));
        cfg.output_dir = PathBuf::new();
        assert!(rejected(&cfg));
    }

    #[test]
    fn rejects_zero_history_capacity() {
        let mut cfg = config(20, 5);
        cfg.history_capacity = 0;
        assert!(rejected(&cfg));
    }

    #[test]
    fn rejects_oversized_history_capacity() {
        let mut cfg = config(20, 5);
        cfg.history_capacity = usize::MAX / 2;
        assert!(rejected(&cfg));
        cfg.history_capacity = HARD_MAX_SAMPLES as usize + 1;
        assert!(rejected(&cfg));
    }

    #[test]
    fn history_capacity_is_trimmed_to_run_length() {
        let plan = config(20, 5).validate().unwrap();
        assert_eq!(plan.history_capacity, 4);

        let mut cfg = config(100, 1);
        cfg.history_capacity = 8;
        assert_eq!(cfg.validate().unwrap().history_capacity, 8);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: MonitorConfig = toml::from_str(
            r#"
            duration_secs = 60
            disk_mount = "/home"

            [limits]
            max_samples = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.duration_secs, 60);
        assert_eq!(cfg.interval_secs, 5);
        assert_eq!(cfg.disk_mount, Some(PathBuf::from("/home")));
        assert_eq!(cfg.limits.max_samples, 10);
        assert_eq!(cfg.limits.max_duration_secs, 86_400);
        assert!(cfg.validate().is_err());
    }
}
