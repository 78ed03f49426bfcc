//! Result Store - experiment records and their persisted reports
//!
//! The store owns every experiment of a run, keyed by name, and renders the
//! per-experiment and aggregate CSV reports into its results directory.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde_json::{Map, Value};
use tracing::debug;

use super::{BenchmarkOutput, DataPoint, ExperimentRecord, Report};
use crate::{Error, Result};

/// Metadata key holding the path of the experiment's metadata snapshot.
pub const LOCATION_KEY: &str = "location";

/// File name of the per-experiment metadata snapshot.
pub const METADATA_FILE: &str = "metadata.json";

/// In-memory store for experiment results backed by a results directory.
///
/// ## Design
///
/// Experiments keep their registration order, which is also the row order
/// of every report. A name index gives O(1) lookups.
#[derive(Debug)]
pub struct ResultStore {
    directory: PathBuf,
    experiments: Vec<ExperimentRecord>,
    index: HashMap<String, usize>,
}

impl ResultStore {
    /// Create a store writing into `directory`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            experiments: Vec::new(),
            index: HashMap::new(),
        })
    }

    /// Results directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Check if the store holds no experiments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Get the number of experiments in the store.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Register an experiment. Existing experiments are left untouched.
    pub fn create_experiment(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.index.contains_key(&name) {
            return;
        }
        self.index.insert(name.clone(), self.experiments.len());
        self.experiments.push(ExperimentRecord::new(name));
    }

    /// Check if an experiment is registered.
    #[must_use]
    pub fn has_experiment(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Check if a benchmark is registered for an experiment.
    #[must_use]
    pub fn has_benchmark(&self, experiment: &str, benchmark: &str) -> bool {
        self.get_experiment(experiment)
            .is_some_and(|record| record.has_benchmark(benchmark))
    }

    /// Get an experiment by name.
    #[must_use]
    pub fn get_experiment(&self, name: &str) -> Option<&ExperimentRecord> {
        self.index.get(name).map(|&i| &self.experiments[i])
    }

    /// Experiments, in registration order.
    pub fn experiments(&self) -> impl Iterator<Item = &ExperimentRecord> {
        self.experiments.iter()
    }

    /// Experiment names, in registration order.
    pub fn experiment_names(&self) -> impl Iterator<Item = &str> {
        self.experiments.iter().map(ExperimentRecord::name)
    }

    /// Merge metadata into an experiment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownExperiment`] if the experiment is not registered.
    pub fn add_metadata(&mut self, experiment: &str, metadata: Map<String, Value>) -> Result<()> {
        self.experiment_mut(experiment)?.add_metadata(metadata);
        Ok(())
    }

    /// Merge configuration into an experiment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownExperiment`] if the experiment is not registered.
    pub fn add_configuration(
        &mut self,
        experiment: &str,
        configuration: Map<String, Value>,
    ) -> Result<()> {
        self.experiment_mut(experiment)?
            .add_configuration(configuration);
        Ok(())
    }

    /// Register a benchmark for an experiment.
    ///
    /// Unknown experiments are ignored; the benchmark simply stays
    /// unregistered and later writes to it fail.
    pub fn add_benchmark(&mut self, experiment: &str, benchmark: impl Into<String>) {
        if let Ok(record) = self.experiment_mut(experiment) {
            record.add_benchmark(benchmark);
        }
    }

    /// Append one or more data points.
    ///
    /// Elements of a batch that are not JSON objects are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBenchmark`] if the (experiment, benchmark) pair
    /// was never registered. Nothing is stored in that case.
    pub fn add_data_points(
        &mut self,
        experiment: &str,
        benchmark: &str,
        output: impl Into<BenchmarkOutput>,
    ) -> Result<usize> {
        if !self.has_benchmark(experiment, benchmark) {
            return Err(Error::UnknownBenchmark {
                experiment: experiment.to_string(),
                benchmark: benchmark.to_string(),
            });
        }
        let record = self.experiment_mut(experiment)?;
        let points = output.into().into_data_points();
        let added = points.len();
        for point in points {
            record.add_data_point(benchmark, point)?;
        }
        Ok(added)
    }

    /// Data points for (experiment, benchmark); empty if either is unknown.
    #[must_use]
    pub fn data_points(&self, experiment: &str, benchmark: &str) -> &[DataPoint] {
        self.get_experiment(experiment)
            .map_or(&[][..], |record| record.data_points(benchmark))
    }

    /// Metadata of an experiment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownExperiment`] if the experiment is not registered.
    pub fn metadata(&self, experiment: &str) -> Result<&Map<String, Value>> {
        self.experiment(experiment).map(ExperimentRecord::metadata)
    }

    /// Configuration of an experiment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownExperiment`] if the experiment is not registered.
    pub fn configuration(&self, experiment: &str) -> Result<&Map<String, Value>> {
        self.experiment(experiment)
            .map(ExperimentRecord::configuration)
    }

    /// Distinct benchmark names across all experiments, first-seen order.
    #[must_use]
    pub fn benchmark_names(&self) -> Vec<String> {
        let names: IndexSet<&str> = self
            .experiments
            .iter()
            .flat_map(|record| record.benchmark_names())
            .collect();
        names.into_iter().map(String::from).collect()
    }

    /// Report for one benchmark across all experiments.
    #[must_use]
    pub fn aggregate_report(&self, benchmark: &str) -> Report {
        Report::build(benchmark, &self.experiments, &self.experiments)
    }

    /// Report for one benchmark restricted to one experiment's rows.
    ///
    /// Columns are still derived across every experiment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownExperiment`] if the experiment is not registered.
    pub fn experiment_report(&self, experiment: &str, benchmark: &str) -> Result<Report> {
        let record = self.experiment(experiment)?;
        Ok(Report::build(
            benchmark,
            &self.experiments,
            std::iter::once(record),
        ))
    }

    /// Path of the aggregate report for `benchmark`.
    #[must_use]
    pub fn aggregate_csv_path(&self, benchmark: &str) -> PathBuf {
        self.directory.join(format!("results_{benchmark}.csv"))
    }

    /// Directory holding one experiment's detail reports and metadata.
    #[must_use]
    pub fn experiment_directory(&self, experiment: &str) -> PathBuf {
        self.directory.join(experiment)
    }

    /// Render `results_<benchmark>.csv` for every benchmark.
    ///
    /// Files are rewritten from scratch on every call.
    ///
    /// # Errors
    ///
    /// Returns an error if a report file cannot be written.
    pub fn generate_aggregate_csv(&self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for benchmark in self.benchmark_names() {
            let path = self.aggregate_csv_path(&benchmark);
            self.aggregate_report(&benchmark).write_file(&path)?;
            debug!(benchmark = %benchmark, path = %path.display(), "aggregate report written");
            written.push(path);
        }
        Ok(written)
    }

    /// Render `<experiment>/<benchmark>.csv` for each of its benchmarks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownExperiment`] if the experiment is not
    /// registered, or an IO error if a file cannot be written.
    pub fn write_experiment_csv(&self, experiment: &str) -> Result<Vec<PathBuf>> {
        let record = self.experiment(experiment)?;
        let directory = self.experiment_directory(experiment);
        fs::create_dir_all(&directory)?;

        let mut written = Vec::new();
        for benchmark in record.benchmark_names() {
            let path = directory.join(format!("{benchmark}.csv"));
            self.experiment_report(experiment, benchmark)?
                .write_file(&path)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Close an experiment: snapshot its metadata and write its reports.
    ///
    /// The metadata snapshot is appended to `<experiment>/metadata.json`, so
    /// closing twice leaves two concatenated JSON objects in the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownExperiment`] if the experiment is not
    /// registered, or an IO/JSON error if persisting fails.
    pub fn close_experiment(&mut self, experiment: &str) -> Result<PathBuf> {
        let directory = self.experiment_directory(experiment);
        let metadata_path = directory.join(METADATA_FILE);

        let mut location = Map::new();
        location.insert(
            LOCATION_KEY.to_string(),
            Value::String(metadata_path.display().to_string()),
        );
        self.add_metadata(experiment, location)?;

        fs::create_dir_all(&directory)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&metadata_path)?;
        serde_json::to_writer(file, self.metadata(experiment)?)?;

        self.write_experiment_csv(experiment)?;
        debug!(experiment = %experiment, path = %metadata_path.display(), "experiment closed");
        Ok(metadata_path)
    }

    fn experiment(&self, name: &str) -> Result<&ExperimentRecord> {
        self.get_experiment(name)
            .ok_or_else(|| Error::UnknownExperiment(name.to_string()))
    }

    fn experiment_mut(&mut self, name: &str) -> Result<&mut ExperimentRecord> {
        let index = *self
            .index
            .get(name)
            .ok_or_else(|| Error::UnknownExperiment(name.to_string()))?;
        Ok(&mut self.experiments[index])
    }
}
