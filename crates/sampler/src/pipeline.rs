use crate::sampler::{run_blocking, Observer, Sampler};
use resmon_config::{MonitorConfig, RunPlan};
use resmon_core::{Reporter, Result, RunMetadata};
use resmon_system::{ProbeOptions, ProbeSet};
use std::future::Future;
use tracing::info;

/// Validated configuration → probes → sampler → reporter.
pub struct Pipeline {
    plan:     RunPlan,
    observer: Option<Observer>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("plan", &self.plan).finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Validate `config`; fails with a configuration error before any probe
    /// is touched.
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        Ok(Self {
            plan:     config.validate()?,
            observer: None,
        })
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn plan(&self) -> &RunPlan {
        &self.plan
    }

    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            disk_mount: self.plan.disk_mount.clone(),
            gpu:        self.plan.gpu,
        }
    }

    /// Detect the host's probes and run.
    pub async fn run<F: Future>(self, shutdown: F, reporter: &mut dyn Reporter) -> Result<RunMetadata> {
        let options = self.probe_options();
        let probes = run_blocking(move || ProbeSet::detect(&options)).await;
        self.run_with(probes, shutdown, reporter).await
    }

    /// Run with an explicit probe set.
    ///
    /// The reporter is called exactly once, with whatever was collected,
    /// including after cancellation.
    pub async fn run_with<F: Future>(
        self,
        probes: ProbeSet,
        shutdown: F,
        reporter: &mut dyn Reporter,
    ) -> Result<RunMetadata> {
        let mut sampler = Sampler::new(&self.plan, probes);
        if let Some(observer) = self.observer {
            sampler = sampler.with_observer(observer);
        }

        let history = sampler.run(shutdown).await;
        info!("Handing {} sample(s) to the reporter", history.len());
        reporter.report(&history)?;
        Ok(history.metadata)
    }
}
