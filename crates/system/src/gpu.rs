//! Accelerator probing.
//!
//! Only the first NVIDIA device is queried, through `nvidia-smi`.  Hosts
//! without the tool get [`NoGpu`], whose readings are always
//! [`Reading::NotPresent`] so the sample omits the GPU field.

use resmon_core::{GpuRecord, MetricSource, MonitorError, Reading, Result, TickContext};
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const QUERY: &str =
    "--query-gpu=name,utilization.gpu,temperature.gpu,memory.used,memory.total";
const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);
const MIB: u64 = 1 << 20;

/// Why a query produced no record.
#[derive(Debug)]
enum QueryError {
    /// The tool is missing or lists no device.
    NotPresent,
    Failed(MonitorError),
}

/// Queries the first device via `nvidia-smi`.
#[derive(Debug)]
pub struct NvidiaSmiProbe {
    binary: PathBuf,
}

impl NvidiaSmiProbe {
    /// `Some` when `nvidia-smi` answers and lists at least one device.
    pub fn detect() -> Option<Self> {
        let probe = Self {
            binary: PathBuf::from("nvidia-smi"),
        };
        match probe.query() {
            Ok(record) => {
                tracing::info!("GPU detected: {}", record.name);
                Some(probe)
            }
            Err(QueryError::NotPresent) => None,
            Err(QueryError::Failed(e)) => {
                tracing::warn!("nvidia-smi present but unusable: {e}");
                None
            }
        }
    }

    fn query(&self) -> Result<GpuRecord, QueryError> {
        let mut child = Command::new(&self.binary)
            .args([QUERY, "--format=csv,noheader,nounits"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => QueryError::NotPresent,
                _ => QueryError::Failed(MonitorError::sensor("gpu", format!("spawn: {e}"))),
            })?;

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if start.elapsed() >= COMMAND_TIMEOUT => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(QueryError::Failed(MonitorError::sensor("gpu", "nvidia-smi timed out")));
                }
                Ok(None) => std::thread::sleep(Duration::from_millis(10)),
                Err(e) => {
                    return Err(QueryError::Failed(MonitorError::sensor("gpu", format!("wait: {e}"))))
                }
            }
        };
        if !status.success() {
            // nvidia-smi exits non-zero when the driver finds no device.
            return Err(QueryError::NotPresent);
        }

        let mut out = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout
                .read_to_string(&mut out)
                .map_err(|e| QueryError::Failed(MonitorError::sensor("gpu", format!("read: {e}"))))?;
        }
        let line = out.lines().find(|l| !l.trim().is_empty()).ok_or(QueryError::NotPresent)?;
        parse_query_line(line).map_err(QueryError::Failed)
    }
}

impl MetricSource for NvidiaSmiProbe {
    type Record = GpuRecord;

    fn id(&self) -> &'static str {
        "gpu"
    }

    fn sample(&mut self, _tick: &TickContext) -> Reading<GpuRecord> {
        match self.query() {
            Ok(record) => Reading::Available(record),
            Err(QueryError::NotPresent) => Reading::NotPresent,
            Err(QueryError::Failed(e)) => Reading::from(Err::<GpuRecord, _>(e)),
        }
    }
}

/// Stand-in for hosts without an accelerator.
#[derive(Debug, Default)]
pub struct NoGpu;

impl MetricSource for NoGpu {
    type Record = GpuRecord;

    fn id(&self) -> &'static str {
        "gpu"
    }

    fn sample(&mut self, _tick: &TickContext) -> Reading<GpuRecord> {
        Reading::NotPresent
    }
}

/// Parse one CSV row: `name, util %, temp °C, mem used MiB, mem total MiB`.
fn parse_query_line(line: &str) -> Result<GpuRecord> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let &[name, util, temp, used, total] = fields.as_slice() else {
        return Err(MonitorError::sensor(
            "gpu",
            format!("expected 5 fields, got {}: '{line}'", fields.len()),
        ));
    };

    let percent = optional_number::<f32>(util)
        .ok_or_else(|| MonitorError::sensor("gpu", format!("utilization not reported: '{util}'")))?;

    Ok(GpuRecord {
        name:               name.to_string(),
        percent:            percent.clamp(0.0, 100.0),
        temperature:        optional_number(temp),
        memory_used_bytes:  optional_number::<u64>(used).and_then(|m| m.checked_mul(MIB)),
        memory_total_bytes: optional_number::<u64>(total).and_then(|m| m.checked_mul(MIB)),
    })
}

/// `nvidia-smi` prints `[N/A]` or `[Not Supported]` for missing values.
fn optional_number<T: std::str::FromStr>(field: &str) -> Option<T> {
    field.parse().ok()
}
