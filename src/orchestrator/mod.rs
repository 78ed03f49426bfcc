//! Experiment orchestrator
//!
//! Drives the iteration × template × benchmark matrix:
//!
//! ```text
//! Created ──initialize──▶ Initialized ──run_benchmarks──▶ Running ──finalize──▶ Finalized
//! ```
//!
//! `finalize` must run on every exit path; [`crate::api::execute`] is the
//! controller that guarantees it. Dropping an orchestrator that started
//! running without finalizing it still tears down outstanding deployments.

mod naming;
mod state;

pub use naming::NameAllocator;
pub use state::OrchestratorState;

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, info_span, warn};

use crate::context::RunContext;
use crate::experiment::{BenchmarkOutput, ResultStore};
use crate::plugin::{BenchmarkPlugin, PluginRegistry};
use crate::template::{experiment_name, load_configuration};
use crate::{Error, Result};

/// Metadata key recording the experiment name.
pub const EXPERIMENT_NAME_KEY: &str = "experiment_name";

/// Outcome of a finalized run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Directory holding every report of the run.
    pub results_dir: PathBuf,
    /// Number of experiments (templates).
    pub experiments: usize,
    /// Aggregate report files, one per benchmark.
    pub aggregate_reports: Vec<PathBuf>,
    /// Successful deployments.
    pub deployments: usize,
    /// (template, benchmark) units skipped because deployment failed.
    pub skipped_deployments: usize,
    /// Data points stored for the requested benchmarks.
    pub data_points: usize,
}

/// The benchmarking state machine.
pub struct Orchestrator {
    ctx: RunContext,
    store: ResultStore,
    state: OrchestratorState,
    names: NameAllocator,
    benchmarks: Vec<Box<dyn BenchmarkPlugin>>,
    templates: Vec<String>,
    summary: RunSummary,
}

impl Orchestrator {
    /// Validate the context and prepare the results directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the configuration is invalid, or an
    /// IO error if the results directory cannot be created.
    pub fn new(ctx: RunContext) -> Result<Self> {
        ctx.config().validate()?;
        let store = ResultStore::new(ctx.results_dir())?;
        let summary = RunSummary {
            results_dir: store.directory().to_path_buf(),
            ..RunSummary::default()
        };
        Ok(Self {
            ctx,
            store,
            state: OrchestratorState::Created,
            names: NameAllocator::new(),
            benchmarks: Vec::new(),
            templates: Vec::new(),
            summary,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Result store of the run.
    #[must_use]
    pub const fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Run context.
    #[must_use]
    pub const fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Template files under test, in execution order.
    #[must_use]
    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Benchmark instance names, in execution order.
    pub fn benchmark_names(&self) -> impl Iterator<Item = &str> {
        self.benchmarks.iter().map(|b| b.name())
    }

    /// Instantiate the requested benchmarks and register every
    /// (template, benchmark) pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginNotFound`] for an unknown benchmark, an error if
    /// the templates cannot be listed, or [`Error::InvalidState`] when not
    /// called first.
    pub fn initialize(&mut self, registry: &PluginRegistry) -> Result<()> {
        self.state
            .advance(OrchestratorState::Created, OrchestratorState::Initialized)?;
        info!("initialization of benchmarks");

        for spec in &self.ctx.config.benchmarks {
            let instance = self.names.allocate(&spec.name);
            let plugin = registry.instantiate(&spec.name, &instance, &spec.params)?;
            debug!(plugin = %spec.name, benchmark = %plugin.name(), "benchmark instantiated");
            self.benchmarks.push(plugin);
        }

        let config = &self.ctx.config;
        self.templates = self
            .ctx
            .templates
            .list_templates(&config.template_dir, &config.template_extension)?;

        let channels = self.ctx.derived_channels();
        for template in &self.templates {
            let experiment = experiment_name(template);
            self.store.create_experiment(experiment);
            for benchmark in &self.benchmarks {
                self.store.add_benchmark(experiment, benchmark.name());
            }
            for channel in &channels {
                self.store.add_benchmark(experiment, channel.as_str());
            }
        }
        self.summary.experiments = self.store.experiment_count();
        info!(
            templates = self.templates.len(),
            benchmarks = self.benchmarks.len(),
            "result store initialized"
        );
        Ok(())
    }

    /// Execute the full matrix.
    ///
    /// A failed deployment skips only the current (template, benchmark) unit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Plugin`] when a benchmark hook fails, a descriptor or
    /// IO error, or [`Error::InvalidState`] when not initialized. Deployments
    /// may remain outstanding; [`Orchestrator::finalize`] removes them.
    pub fn run_benchmarks(&mut self) -> Result<()> {
        self.state
            .advance(OrchestratorState::Initialized, OrchestratorState::Running)?;
        info!("run benchmarking unit");

        let templates = self.templates.clone();
        for iteration in 0..self.ctx.config.iterations {
            let _span = info_span!("iteration", iteration).entered();
            info!("iteration started");
            for template in &templates {
                self.run_template(template)?;
            }
        }
        info!("experiments completed");
        Ok(())
    }

    fn run_template(&mut self, template: &str) -> Result<()> {
        let experiment = experiment_name(template);
        let configuration = load_configuration(&self.ctx.config.template_dir, template)?;

        let mut metadata = Map::new();
        metadata.insert(
            EXPERIMENT_NAME_KEY.to_string(),
            Value::String(experiment.to_string()),
        );
        self.store.add_metadata(experiment, metadata)?;

        let template_path = self.ctx.config.template_dir.join(template);
        for index in 0..self.benchmarks.len() {
            self.run_unit(index, &template_path, experiment)?;
        }
        info!(experiment = %experiment, "benchmarks finished");

        self.store.add_configuration(experiment, configuration)
    }

    fn run_unit(&mut self, index: usize, template_path: &Path, experiment: &str) -> Result<()> {
        let benchmark = self.benchmarks[index].name().to_string();
        let _span = info_span!("unit", experiment = %experiment, benchmark = %benchmark).entered();

        info!("benchmark started");
        self.benchmarks[index]
            .initialize()
            .map_err(|e| Error::plugin(&benchmark, "initialize", e))?;

        info!("deployment started");
        let deployed = self.ctx.gateway.deploy(
            template_path,
            experiment,
            &self.ctx.config.deployment_parameters,
        );
        if !deployed {
            warn!("deployment failed, skipping benchmark");
            self.summary.skipped_deployments += 1;
            return Ok(());
        }
        info!("deployment completed");
        self.summary.deployments += 1;

        let points = self.benchmarks[index]
            .run()
            .map_err(|e| Error::plugin(&benchmark, "run", e))?
            .into_data_points();
        self.summary.data_points += self.store.add_data_points(
            experiment,
            &benchmark,
            BenchmarkOutput::from(points.clone()),
        )?;
        if let Some(source) = self.ctx.derived.as_mut() {
            let derived = source
                .derive(experiment, &points)
                .map_err(|e| Error::plugin(&benchmark, "derive", e))?;
            for (channel, output) in derived {
                self.store.add_data_points(experiment, &channel, output)?;
            }
        }

        info!("destroying deployment");
        self.ctx.gateway.destroy(experiment);
        self.benchmarks[index]
            .finalize()
            .map_err(|e| Error::plugin(&benchmark, "finalize", e))?;
        info!("benchmark terminated");

        self.store.generate_aggregate_csv()?;
        Ok(())
    }

    /// Close every experiment, write the aggregate reports and tear down
    /// every outstanding deployment.
    ///
    /// Valid from any state but `Finalized`. Teardown happens even when
    /// writing the reports fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if already finalized, or the first
    /// error raised while persisting reports.
    pub fn finalize(&mut self) -> Result<RunSummary> {
        if self.state == OrchestratorState::Finalized {
            return Err(Error::InvalidState {
                expected: "not finalized",
                actual: self.state.name(),
            });
        }
        self.state = OrchestratorState::Finalized;
        info!("benchmarking unit finalization");

        let reports = self.write_reports();
        self.ctx.gateway.destroy_all();
        self.summary.aggregate_reports = reports?;
        Ok(self.summary.clone())
    }

    /// Every experiment is closed even if an earlier one fails; the first
    /// error is returned once the aggregate reports are rendered.
    fn write_reports(&mut self) -> Result<Vec<PathBuf>> {
        let experiments: Vec<String> = self.store.experiment_names().map(String::from).collect();
        let mut first_error = None;
        for experiment in &experiments {
            if let Err(e) = self.store.close_experiment(experiment) {
                error!(experiment = %experiment, error = %e, "closing experiment failed");
                first_error.get_or_insert(e);
            }
        }
        let reports = self.store.generate_aggregate_csv()?;
        first_error.map_or(Ok(reports), Err)
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if self.state == OrchestratorState::Running {
            error!("orchestrator dropped without finalize, destroying outstanding deployments");
            self.ctx.gateway.destroy_all();
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state)
            .field("templates", &self.templates)
            .field("benchmarks", &self.benchmark_names().collect::<Vec<_>>())
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}
