//! Execution context shared by one run

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::config::RunConfig;
use crate::deployment::DeploymentGateway;
use crate::plugin::DerivedMetrics;
use crate::template::{FsTemplateProvider, TemplateProvider};

/// Everything a run depends on, constructed once and owned by the
/// orchestrator for the lifetime of the run.
pub struct RunContext {
    pub(crate) config: RunConfig,
    pub(crate) gateway: Box<dyn DeploymentGateway>,
    pub(crate) templates: Box<dyn TemplateProvider>,
    pub(crate) derived: Option<Box<dyn DerivedMetrics>>,
    started_at: DateTime<Utc>,
}

impl RunContext {
    /// Context listing templates from the file system.
    #[must_use]
    pub fn new(config: RunConfig, gateway: impl DeploymentGateway + 'static) -> Self {
        Self {
            config,
            gateway: Box::new(gateway),
            templates: Box::new(FsTemplateProvider),
            derived: None,
            started_at: Utc::now(),
        }
    }

    /// Replace the template provider.
    #[must_use]
    pub fn with_template_provider(mut self, provider: impl TemplateProvider + 'static) -> Self {
        self.templates = Box::new(provider);
        self
    }

    /// Enable derived-metric channels.
    #[must_use]
    pub fn with_derived_metrics(mut self, derived: impl DerivedMetrics + 'static) -> Self {
        self.derived = Some(Box::new(derived));
        self
    }

    /// Run configuration.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// When the context was created.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Results directory for this run: `<results_root>/<UTC timestamp>`.
    #[must_use]
    pub fn results_dir(&self) -> PathBuf {
        self.config
            .results_root
            .join(self.started_at.format("%Y%m%dT%H%M%S%.3fZ").to_string())
    }

    /// Channel names contributed by the derived-metric source, if any.
    #[must_use]
    pub fn derived_channels(&self) -> Vec<String> {
        self.derived
            .as_ref()
            .map(|derived| derived.channels())
            .unwrap_or_default()
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("config", &self.config)
            .field("derived_channels", &self.derived_channels())
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}
