//! resmon: samples CPU, memory, disk, network and GPU usage at a fixed
//! cadence, then writes the history and a summary.
//!
//! Run with:  `RUST_LOG=debug resmon -d 5 -i 2`

use anyhow::{Context, Result};
use clap::Parser;
use resmon_config::MonitorConfig;
use resmon_core::{MonitorError, Sample};
use resmon_report::{format_rate, JsonReporter, TextReporter};
use resmon_sampler::{Pipeline, Progress};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "resmon")]
#[command(about = "Sample host resource usage for a fixed period and report on it")]
#[command(version)]
struct Cli {
    /// Run length in minutes
    #[arg(short, long, conflicts_with = "duration_secs")]
    duration: Option<u64>,

    /// Run length in seconds
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Seconds between samples
    #[arg(short, long)]
    interval: Option<u64>,

    /// Directory that receives history.json and summary.json
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mount point whose usage is tracked
    #[arg(long)]
    disk: Option<PathBuf>,

    /// Skip GPU detection
    #[arg(long)]
    no_gpu: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn default_filter(&self) -> &'static str {
        match (self.verbose, self.quiet) {
            (true, _) => "debug",
            (_, true) => "warn",
            _ => "info",
        }
    }

    /// Command-line values win over the file.
    fn apply(&self, config: &mut MonitorConfig) {
        if let Some(minutes) = self.duration {
            config.duration_secs = minutes.saturating_mul(60);
        }
        if let Some(secs) = self.duration_secs {
            config.duration_secs = secs;
        }
        if let Some(secs) = self.interval {
            config.interval_secs = secs;
        }
        if let Some(dir) = &self.output {
            config.output_dir = dir.clone();
        }
        if let Some(mount) = &self.disk {
            config.disk_mount = Some(mount.clone());
        }
        if self.no_gpu {
            config.gpu = false;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Structured logging; RUST_LOG takes precedence over the flags.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.default_filter())),
        )
        .init();

    info!("resmon v{} starting", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            match e.downcast_ref::<MonitorError>() {
                Some(err) if err.is_fatal() => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = cli.config.clone().unwrap_or_else(resmon_config::default_path);
    let mut config = resmon_config::load(&path)?;
    cli.apply(&mut config);

    let pipeline = Pipeline::new(&config)?.with_observer(Box::new(log_progress));
    let output_dir = pipeline.plan().output_dir.clone();

    let mut reporters = (JsonReporter::new(&output_dir), TextReporter::stdout());
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // No signal handler; run to completion.
            std::future::pending::<()>().await;
        }
        info!("Ctrl-C received, stopping after the current tick");
    };

    let meta = pipeline
        .run(shutdown, &mut reporters)
        .await
        .with_context(|| format!("failed to report into '{}'", output_dir.display()))?;

    info!("{} sample(s) collected", meta.sample_count);
    for path in reporters.0.written() {
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn log_progress(sample: &Sample, progress: &Progress) {
    let cpu = sample
        .cpu
        .available()
        .map_or_else(|| "n/a".to_string(), |c| format!("{:.1}%", c.percent));
    let mem = sample
        .memory
        .available()
        .map_or_else(|| "n/a".to_string(), |m| format!("{:.1}%", m.percent));
    let up = sample.upload_rate().map_or_else(|| "n/a".to_string(), format_rate);
    let down = sample.download_rate().map_or_else(|| "n/a".to_string(), format_rate);

    info!(
        "[{:>3.0}%] sample {}/{}: cpu {cpu}, mem {mem}, up {up}, down {down}",
        progress.fraction() * 100.0,
        progress.collected,
        progress.total_ticks,
    );
}
