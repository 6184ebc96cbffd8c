use crate::stats::RunSummary;
use resmon_core::{HistorySnapshot, MonitorError, Reporter, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub const HISTORY_FILE: &str = "history.json";
pub const SUMMARY_FILE: &str = "summary.json";

/// Writes the raw history and the derived summary as pretty-printed JSON
/// into one output directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct JsonReporter {
    dir:     PathBuf,
    written: Vec<PathBuf>,
}

impl JsonReporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir:     dir.into(),
            written: Vec::new(),
        }
    }

    /// Files produced by the last successful report.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| MonitorError::Report(format!("failed to serialise {name}: {e}")))?;
        fs::write(&path, json)
            .map_err(|e| MonitorError::Report(format!("failed to write {}: {e}", path.display())))?;
        Ok(path)
    }
}

impl Reporter for JsonReporter {
    fn report(&mut self, history: &HistorySnapshot) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            MonitorError::Report(format!("cannot create {}: {e}", self.dir.display()))
        })?;

        let summary = RunSummary::from_snapshot(history);
        let written = vec![
            self.write(HISTORY_FILE, history)?,
            self.write(SUMMARY_FILE, &summary)?,
        ];
        info!("Wrote {} sample(s) to {}", history.len(), self.dir.display());
        self.written = written;
        Ok(())
    }
}
