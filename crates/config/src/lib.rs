pub mod schema;

pub use schema::{Limits, MonitorConfig, RunPlan, HARD_MAX_DURATION_SECS, HARD_MAX_SAMPLES};

use resmon_core::{MonitorError, Result};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const APP_DIR: &str = "resmon";
const FILE_NAME: &str = "resmon.toml";

/// Read `resmon.toml`.
///
/// A missing file is not an error: the run falls back to the built-in
/// duration, interval and output directory, and says so.  Unreadable or
/// malformed files are configuration errors.
pub fn load(path: impl AsRef<Path>) -> Result<MonitorConfig> {
    let path = path.as_ref();
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let cfg = MonitorConfig::default();
            warn!(
                "No config at '{}'; sampling for {}s every {}s into '{}'",
                path.display(),
                cfg.duration_secs,
                cfg.interval_secs,
                cfg.output_dir.display()
            );
            return Ok(cfg);
        }
        Err(e) => {
            return Err(MonitorError::Configuration(format!(
                "cannot read '{}': {e}",
                path.display()
            )))
        }
    };

    let cfg: MonitorConfig = toml::from_str(&raw)
        .map_err(|e| MonitorError::Configuration(format!("{}: {e}", path.display())))?;
    debug!(
        duration_secs = cfg.duration_secs,
        interval_secs = cfg.interval_secs,
        history_capacity = cfg.history_capacity,
        "Loaded '{}'",
        path.display()
    );
    Ok(cfg)
}

/// `$XDG_CONFIG_HOME/resmon/resmon.toml`, or `~/.config/resmon/resmon.toml`
/// when the variable is unset or not absolute.
pub fn default_path() -> PathBuf {
    config_home(std::env::var_os("XDG_CONFIG_HOME"), std::env::var_os("HOME"))
        .join(APP_DIR)
        .join(FILE_NAME)
}

fn config_home(xdg: Option<OsString>, home: Option<OsString>) -> PathBuf {
    match xdg.map(PathBuf::from) {
        Some(dir) if dir.is_absolute() => dir,
        _ => home.map_or_else(|| PathBuf::from("."), PathBuf::from).join(".config"),
    }
}
