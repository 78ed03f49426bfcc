//! Deployment gateway: the boundary to whatever instantiates environments

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::info;

/// Parameters passed to every deployment.
pub type DeploymentParameters = BTreeMap<String, String>;

/// Deploys and destroys named instantiations of a template.
///
/// Calls block until the remote side completes; there is no timeout.
pub trait DeploymentGateway {
    /// Deploy `template` under the handle `experiment`.
    ///
    /// Returns `false` when the deployment did not come up.
    fn deploy(
        &mut self,
        template: &Path,
        experiment: &str,
        parameters: &DeploymentParameters,
    ) -> bool;

    /// Tear down the deployment registered under `experiment`.
    fn destroy(&mut self, experiment: &str);

    /// Tear down every deployment still outstanding.
    fn destroy_all(&mut self);
}

/// Gateway that deploys nothing and only keeps handle bookkeeping.
///
/// Useful for exercising benchmarks and reports without an orchestration
/// backend.
#[derive(Debug, Default)]
pub struct DryRunGateway {
    deployed: BTreeSet<String>,
    deploy_count: usize,
}

impl DryRunGateway {
    /// Create a gateway with no outstanding deployments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles deployed and not yet destroyed.
    #[must_use]
    pub const fn outstanding(&self) -> &BTreeSet<String> {
        &self.deployed
    }

    /// Total number of deploy calls.
    #[must_use]
    pub const fn deploy_count(&self) -> usize {
        self.deploy_count
    }
}

impl DeploymentGateway for DryRunGateway {
    fn deploy(
        &mut self,
        template: &Path,
        experiment: &str,
        parameters: &DeploymentParameters,
    ) -> bool {
        info!(
            experiment = %experiment,
            template = %template.display(),
            parameters = parameters.len(),
            "dry-run deploy"
        );
        self.deploy_count += 1;
        self.deployed.insert(experiment.to_string());
        true
    }

    fn destroy(&mut self, experiment: &str) {
        self.deployed.remove(experiment);
    }

    fn destroy_all(&mut self) {
        self.deployed.clear();
    }
}
