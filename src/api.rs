//! Library entry points

use tracing::{error, info};

use crate::context::RunContext;
use crate::orchestrator::{Orchestrator, RunSummary};
use crate::plugin::{Features, PluginRegistry};
use crate::{Error, Result};

/// Identifiers of every registered test case.
#[must_use]
pub fn available_test_cases(registry: &PluginRegistry) -> Vec<String> {
    registry.available_plugins()
}

/// Features (description, parameters, allowed values) of one test case.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an empty identifier and
/// [`Error::PluginNotFound`] when nothing matches.
pub fn test_case_features(registry: &PluginRegistry, test_case: &str) -> Result<Features> {
    if test_case.trim().is_empty() {
        return Err(Error::InvalidInput(
            "the test case identifier must not be empty".to_string(),
        ));
    }
    registry.features(test_case)
}

/// Run the whole benchmarking workflow.
///
/// Initialization and execution errors are reported after `finalize` has
/// written the reports and torn down every deployment. If both the run and
/// the finalization fail, the run error is returned and the other is logged.
///
/// # Errors
///
/// Returns validation errors before anything is deployed, then the first
/// error raised by initialization, execution or finalization.
pub fn execute(ctx: RunContext, registry: &PluginRegistry) -> Result<RunSummary> {
    let mut orchestrator = Orchestrator::new(ctx)?;

    info!("benchmarking unit initialization");
    let outcome = orchestrator
        .initialize(registry)
        .and_then(|()| orchestrator.run_benchmarks());

    let finalized = orchestrator.finalize();
    match (outcome, finalized) {
        (Ok(()), finalized) => finalized,
        (Err(run_error), Ok(_)) => Err(run_error),
        (Err(run_error), Err(finalize_error)) => {
            error!(error = %finalize_error, "finalization failed after run error");
            Err(run_error)
        }
    }
}
