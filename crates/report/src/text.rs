use crate::stats::{RunSummary, SeriesStats};
use resmon_core::{HistorySnapshot, MonitorError, Reporter, Result, RunEnd};
use std::fmt::Write as _;
use std::io::Write;

const PLACEHOLDER: &str = "n/a";

/// Byte count in the largest binary unit that keeps the figure at or
/// above one, e.g. `16.0 GiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

    let mut value = bytes as f64;
    let mut unit = None;
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = Some(next);
    }
    match unit {
        Some(unit) => format!("{value:.1} {unit}"),
        None => format!("{bytes} B"),
    }
}

/// Format a bytes-per-second rate into a human-readable string.
pub fn format_rate(bps: f64) -> String {
    const MB: f64 = 1_000_000.0;
    const KB: f64 = 1_000.0;

    if bps >= MB {
        format!("{:.1} MB/s", bps / MB)
    } else if bps >= KB {
        format!("{:.1} KB/s", bps / KB)
    } else {
        format!("{bps:.0} B/s")
    }
}

fn percent(v: f64) -> String {
    format!("{v:.1}%")
}

fn celsius(v: f64) -> String {
    format!("{v:.1}°C")
}

fn row(out: &mut String, label: &str, stats: Option<&SeriesStats>, fmt: fn(f64) -> String) {
    // Writing into a String cannot fail.
    let _ = match stats {
        Some(s) => writeln!(out, "  {label:<18} {:>12} {:>12} {:>12}", fmt(s.avg), fmt(s.min), fmt(s.max)),
        None => writeln!(out, "  {label:<18} {PLACEHOLDER:>12} {PLACEHOLDER:>12} {PLACEHOLDER:>12}"),
    };
}

/// Plain-text summary table.  Series with no readings print `n/a`.
pub fn format_summary(summary: &RunSummary) -> String {
    let meta = &summary.metadata;
    let mut out = String::new();

    let end = match meta.end {
        RunEnd::Completed => "completed",
        RunEnd::Cancelled => "cancelled",
    };
    let _ = writeln!(
        out,
        "Run {} ({end}): {} sample(s) every {}s over {}s",
        meta.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
        meta.sample_count,
        meta.interval_secs,
        meta.duration_secs,
    );
    if meta.evicted > 0 {
        let _ = writeln!(out, "  {} older sample(s) dropped from history", meta.evicted);
    }
    let _ = writeln!(out, "  {:<18} {:>12} {:>12} {:>12}", "", "avg", "min", "max");

    row(&mut out, "CPU usage", summary.cpu_percent.as_ref(), percent);
    row(&mut out, "CPU temperature", summary.cpu_temperature.as_ref(), celsius);
    if let Some(mhz) = summary.cpu_max_frequency_mhz {
        let _ = writeln!(out, "  {:<18} {:>12}", "CPU max frequency", format!("{mhz} MHz"));
    }
    row(&mut out, "Memory usage", summary.memory_percent.as_ref(), percent);
    if let Some(total) = summary.memory_total_bytes {
        let _ = writeln!(out, "  {:<18} {:>12}", "Memory installed", format_bytes(total));
    }
    row(&mut out, "Swap usage", summary.swap_percent.as_ref(), percent);
    row(&mut out, "Disk usage", summary.disk_percent.as_ref(), percent);
    row(&mut out, "Disk read", summary.disk_read_rate.as_ref(), format_rate);
    row(&mut out, "Disk write", summary.disk_write_rate.as_ref(), format_rate);
    row(&mut out, "Upload", summary.upload_rate.as_ref(), format_rate);
    row(&mut out, "Download", summary.download_rate.as_ref(), format_rate);

    if summary.gpu_samples == 0 {
        let _ = writeln!(out, "  GPU: no GPU detected");
    } else {
        row(&mut out, "GPU usage", summary.gpu_percent.as_ref(), percent);
        row(&mut out, "GPU temperature", summary.gpu_temperature.as_ref(), celsius);
    }

    let gaps = summary.unavailable;
    if gaps.cpu + gaps.memory + gaps.disk + gaps.network > 0 {
        let _ = writeln!(
            out,
            "  Unavailable readings: cpu {}, memory {}, disk {}, network {}",
            gaps.cpu, gaps.memory, gaps.disk, gaps.network
        );
    }
    if summary.discontinuities > 0 {
        let _ = writeln!(out, "  Counter resets: {}", summary.discontinuities);
    }
    out
}

/// Writes the text summary to any byte sink, stdout by default.
#[derive(Debug)]
pub struct TextReporter<W = std::io::Stdout> {
    out: W,
}

impl TextReporter {
    pub fn stdout() -> Self {
        Self { out: std::io::stdout() }
    }
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn report(&mut self, history: &HistorySnapshot) -> Result<()> {
        let text = format_summary(&RunSummary::from_snapshot(history));
        self.out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|e| MonitorError::Report(format!("failed to write summary: {e}")))
    }
}
