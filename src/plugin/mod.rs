//! Benchmark plugins
//!
//! A benchmark plugin drives one workload against a deployed environment and
//! reports what it measured. Plugins are made available through an explicit
//! [`PluginRegistry`] table instead of being discovered at runtime.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use template_bench::experiment::BenchmarkOutput;
//! use template_bench::plugin::{BenchmarkPlugin, Features, Params, PluginRegistry};
//!
//! struct Idle {
//!     name: String,
//! }
//!
//! impl BenchmarkPlugin for Idle {
//!     fn name(&self) -> &str {
//!         &self.name
//!     }
//!
//!     fn features(&self) -> Features {
//!         Features::new("Does nothing")
//!     }
//!
//!     fn run(&mut self) -> anyhow::Result<BenchmarkOutput> {
//!         Ok(json!({"idle": true}).into())
//!     }
//! }
//!
//! let mut registry = PluginRegistry::new();
//! registry.register("idle", "Idle", |name: &str, _params: &Params| {
//!     Box::new(Idle { name: name.to_string() }) as Box<dyn BenchmarkPlugin>
//! });
//! assert_eq!(registry.available_plugins(), vec!["idle.Idle"]);
//! ```

mod registry;

pub use registry::{PluginFactory, PluginRegistry};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::experiment::{BenchmarkOutput, DataPoint};

/// Construction parameters handed to a plugin factory.
pub type Params = Map<String, Value>;

/// Description of what a plugin accepts, for users picking test cases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    /// Human-readable description.
    pub description: String,
    /// Parameter names the plugin understands.
    pub parameters: Vec<String>,
    /// Allowed values per parameter, when restricted.
    pub allowed_values: BTreeMap<String, Vec<String>>,
    /// Default value per parameter.
    pub default_values: BTreeMap<String, String>,
}

impl Features {
    /// Features with a description and no parameters.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Declare a parameter with its allowed values and default.
    #[must_use]
    pub fn parameter(
        mut self,
        name: impl Into<String>,
        allowed: &[&str],
        default: impl Into<String>,
    ) -> Self {
        let name = name.into();
        if !allowed.is_empty() {
            self.allowed_values.insert(
                name.clone(),
                allowed.iter().map(ToString::to_string).collect(),
            );
        }
        self.default_values.insert(name.clone(), default.into());
        self.parameters.push(name);
        self
    }
}

/// A pluggable workload driver.
///
/// Hooks are called in the order `initialize`, `run`, `finalize` once per
/// (iteration, template). `run` is skipped, and so are `finalize` and the
/// teardown, when the deployment fails.
pub trait BenchmarkPlugin {
    /// Instance name assigned at construction.
    fn name(&self) -> &str;

    /// Description of the plugin's parameters.
    fn features(&self) -> Features;

    /// Prepare the benchmark before the environment is deployed.
    ///
    /// # Errors
    ///
    /// Any error aborts the run.
    fn initialize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Execute the workload against the deployed environment.
    ///
    /// # Errors
    ///
    /// Any error aborts the run.
    fn run(&mut self) -> anyhow::Result<BenchmarkOutput>;

    /// Release resources after the environment is torn down.
    ///
    /// # Errors
    ///
    /// Any error aborts the run.
    fn finalize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Analytics computed from a benchmark's fresh results, stored in extra
/// benchmark channels of the same experiment (e.g. a workload fingerprint).
pub trait DerivedMetrics {
    /// Channel names to register on every experiment.
    fn channels(&self) -> Vec<String>;

    /// Derive outputs for the channels after a successful benchmark run.
    ///
    /// `points` are the data points the benchmark just produced. Channels
    /// missing from the result receive nothing this time.
    ///
    /// # Errors
    ///
    /// Any error aborts the run.
    fn derive(
        &mut self,
        experiment: &str,
        points: &[DataPoint],
    ) -> anyhow::Result<BTreeMap<String, BenchmarkOutput>>;
}
