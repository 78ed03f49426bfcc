//! Error types for template-bench
//!
//! Deployment failures are not errors: the gateway reports them as `false`
//! and the orchestrator skips the affected unit of work.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// template-bench error types
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed argument to a public entry point
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Required configuration value missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Write against an experiment that was never created
    #[error("Unknown experiment '{0}': create_experiment must run before data is attached")]
    UnknownExperiment(String),

    /// Write against a benchmark that was never registered for the experiment
    #[error("Unknown benchmark '{benchmark}' for experiment '{experiment}': register it with add_benchmark first")]
    UnknownBenchmark {
        /// Experiment name
        experiment: String,
        /// Benchmark instance name
        benchmark: String,
    },

    /// No registered plugin matches the identifier
    #[error("Benchmark plugin not found: {0}\nUse available_test_cases() to list registered plugins")]
    PluginNotFound(String),

    /// A benchmark plugin hook returned an error
    #[error("Benchmark '{benchmark}' failed in {hook}: {source}")]
    Plugin {
        /// Benchmark instance name
        benchmark: String,
        /// Hook that failed (initialize, run, finalize, derive)
        hook: &'static str,
        /// Error reported by the plugin
        #[source]
        source: anyhow::Error,
    },

    /// Lifecycle operation called out of order
    #[error("Invalid orchestrator state: expected {expected}, found {actual}")]
    InvalidState {
        /// State the operation requires
        expected: &'static str,
        /// Current state
        actual: &'static str,
    },

    /// Template configuration descriptor could not be used
    #[error("Template descriptor {}: {reason}", path.display())]
    Descriptor {
        /// Descriptor path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Wrap a plugin hook failure.
    pub fn plugin(benchmark: impl Into<String>, hook: &'static str, source: anyhow::Error) -> Self {
        Self::Plugin {
            benchmark: benchmark.into(),
            hook,
            source,
        }
    }
}
