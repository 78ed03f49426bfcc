//! Experiment Record - everything observed for one template

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::DataPoint;
use crate::{Error, Result};

/// Data points recorded for one benchmark instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkSeries {
    name: String,
    data_points: Vec<DataPoint>,
}

impl BenchmarkSeries {
    /// Benchmark instance name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recorded data points, in append order.
    #[must_use]
    pub fn data_points(&self) -> &[DataPoint] {
        &self.data_points
    }
}

/// Experiment Record represents one template under test.
///
/// Benchmarks must be registered with [`ExperimentRecord::add_benchmark`]
/// before data points can be appended to them. Reads of an unregistered
/// benchmark yield an empty slice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentRecord {
    name: String,
    created_at: DateTime<Utc>,
    metadata: Map<String, Value>,
    configuration: Map<String, Value>,
    benchmarks: Vec<BenchmarkSeries>,
}

impl ExperimentRecord {
    /// Create a new, empty experiment record.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            metadata: Map::new(),
            configuration: Map::new(),
            benchmarks: Vec::new(),
        }
    }

    /// Create a builder for constructing a populated record.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ExperimentRecordBuilder {
        ExperimentRecordBuilder::new(name)
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the experiment metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Get the experiment configuration.
    #[must_use]
    pub const fn configuration(&self) -> &Map<String, Value> {
        &self.configuration
    }

    /// Merge metadata into the record; existing keys are overwritten.
    pub fn add_metadata(&mut self, metadata: Map<String, Value>) {
        self.metadata.extend(metadata);
    }

    /// Merge configuration into the record; existing keys are overwritten.
    pub fn add_configuration(&mut self, configuration: Map<String, Value>) {
        self.configuration.extend(configuration);
    }

    /// Register a benchmark. Registering an existing name clears its points.
    pub fn add_benchmark(&mut self, benchmark: impl Into<String>) {
        let benchmark = benchmark.into();
        match self.series_mut(&benchmark) {
            Some(series) => series.data_points.clear(),
            None => self.benchmarks.push(BenchmarkSeries {
                name: benchmark,
                data_points: Vec::new(),
            }),
        }
    }

    /// Append a data point to a registered benchmark.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBenchmark`] if the benchmark is not registered.
    pub fn add_data_point(&mut self, benchmark: &str, data_point: DataPoint) -> Result<()> {
        let Some(series) = self
            .benchmarks
            .iter_mut()
            .find(|series| series.name == benchmark)
        else {
            return Err(Error::UnknownBenchmark {
                experiment: self.name.clone(),
                benchmark: benchmark.to_string(),
            });
        };
        series.data_points.push(data_point);
        Ok(())
    }

    /// Data points for a benchmark; empty if it was never registered.
    #[must_use]
    pub fn data_points(&self, benchmark: &str) -> &[DataPoint] {
        self.benchmarks
            .iter()
            .find(|series| series.name == benchmark)
            .map_or(&[][..], BenchmarkSeries::data_points)
    }

    /// Whether a benchmark is registered for this experiment.
    #[must_use]
    pub fn has_benchmark(&self, benchmark: &str) -> bool {
        self.benchmarks.iter().any(|series| series.name == benchmark)
    }

    /// Registered benchmark names, in registration order.
    pub fn benchmark_names(&self) -> impl Iterator<Item = &str> {
        self.benchmarks.iter().map(|series| series.name.as_str())
    }

    /// Registered benchmark series.
    #[must_use]
    pub fn benchmarks(&self) -> &[BenchmarkSeries] {
        &self.benchmarks
    }

    fn series_mut(&mut self, benchmark: &str) -> Option<&mut BenchmarkSeries> {
        self.benchmarks
            .iter_mut()
            .find(|series| series.name == benchmark)
    }
}

/// Builder for `ExperimentRecord`.
#[derive(Debug)]
pub struct ExperimentRecordBuilder {
    record: ExperimentRecord,
}

impl ExperimentRecordBuilder {
    /// Create a new builder with the experiment name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            record: ExperimentRecord::new(name),
        }
    }

    /// Set the experiment metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.record.add_metadata(metadata);
        self
    }

    /// Set the experiment configuration.
    #[must_use]
    pub fn configuration(mut self, configuration: Map<String, Value>) -> Self {
        self.record.add_configuration(configuration);
        self
    }

    /// Register a benchmark with its data points.
    #[must_use]
    pub fn benchmark(mut self, name: impl Into<String>, data_points: Vec<DataPoint>) -> Self {
        let name = name.into();
        self.record.add_benchmark(name.clone());
        if let Some(series) = self.record.series_mut(&name) {
            series.data_points = data_points;
        }
        self
    }

    /// Set a custom creation timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.record.created_at = created_at;
        self
    }

    /// Build the `ExperimentRecord`.
    #[must_use]
    pub fn build(self) -> ExperimentRecord {
        self.record
    }
}
