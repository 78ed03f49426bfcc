//! Run configuration
//!
//! A run is described by a JSON document:
//!
//! ```json
//! {
//!   "template_dir": "heat_templates",
//!   "iterations": 2,
//!   "benchmarks": [{"name": "rfc2544_throughput", "params": {"packet_size": "64"}}],
//!   "deployment_parameters": {"flavor": "m1.small"}
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::deployment::DeploymentParameters;
use crate::plugin::Params;
use crate::{Error, Result};

/// Default template file extension.
pub const DEFAULT_TEMPLATE_EXTENSION: &str = ".yaml";

/// Default root under which timestamped results directories are created.
pub const DEFAULT_RESULTS_ROOT: &str = "results";

/// One requested benchmark: plugin identifier plus construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSpec {
    /// Plugin identifier (`"<module>.<ClassName>"` or bare module).
    pub name: String,
    /// Parameters handed to the plugin factory.
    #[serde(default)]
    pub params: Params,
}

impl BenchmarkSpec {
    /// Spec without parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Params::new(),
        }
    }

    /// Spec with parameters.
    #[must_use]
    pub fn with_params(name: impl Into<String>, params: Params) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Everything a run needs to know up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory holding the generated templates and their descriptors.
    pub template_dir: PathBuf,
    /// Benchmarks to run against every template, in order.
    pub benchmarks: Vec<BenchmarkSpec>,
    /// Extension identifying template files.
    #[serde(default = "default_template_extension")]
    pub template_extension: String,
    /// Root of the timestamped results directories.
    #[serde(default = "default_results_root")]
    pub results_root: PathBuf,
    /// Repetitions of the template × benchmark matrix.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Parameters passed to every deployment.
    #[serde(default)]
    pub deployment_parameters: DeploymentParameters,
}

fn default_template_extension() -> String {
    DEFAULT_TEMPLATE_EXTENSION.to_string()
}

fn default_results_root() -> PathBuf {
    PathBuf::from(DEFAULT_RESULTS_ROOT)
}

const fn default_iterations() -> u32 {
    1
}

impl RunConfig {
    /// Configuration with defaults for everything but templates and benchmarks.
    #[must_use]
    pub fn new(template_dir: impl Into<PathBuf>, benchmarks: Vec<BenchmarkSpec>) -> Self {
        Self {
            template_dir: template_dir.into(),
            benchmarks,
            template_extension: default_template_extension(),
            results_root: default_results_root(),
            iterations: default_iterations(),
            deployment_parameters: DeploymentParameters::new(),
        }
    }

    /// Set the number of iterations.
    #[must_use]
    pub const fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the results root.
    #[must_use]
    pub fn results_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.results_root = root.into();
        self
    }

    /// Set the template extension.
    #[must_use]
    pub fn template_extension(mut self, extension: impl Into<String>) -> Self {
        self.template_extension = extension.into();
        self
    }

    /// Add a deployment parameter.
    #[must_use]
    pub fn deployment_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.deployment_parameters.insert(key.into(), value.into());
        self
    }

    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is malformed or lacks a
    /// required field.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }

    /// Check the configuration before anything is deployed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty benchmark name, an
    /// extension not starting with `.`, or a missing template directory.
    pub fn validate(&self) -> Result<()> {
        if let Some(index) = self.benchmarks.iter().position(|b| b.name.trim().is_empty()) {
            return Err(Error::InvalidInput(format!(
                "benchmark #{index} has an empty name"
            )));
        }
        if self.template_extension.len() < 2 || !self.template_extension.starts_with('.') {
            return Err(Error::InvalidInput(format!(
                "template extension '{}' must look like '.yaml'",
                self.template_extension
            )));
        }
        if !self.template_dir.is_dir() {
            return Err(Error::InvalidInput(format!(
                "template directory {} does not exist",
                self.template_dir.display()
            )));
        }
        Ok(())
    }
}
