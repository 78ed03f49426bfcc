//! # template-bench: Deploy, Benchmark, Tear Down, Report
//!
//! template-bench repeatedly deploys candidate environments (one per
//! generated template), runs pluggable benchmarks against each deployment
//! and aggregates whatever the benchmarks measured into CSV reports.
//!
//! The experiment matrix is iteration × template × benchmark:
//!
//! - **Orchestrator**: lifecycle state machine driving deploy → benchmark →
//!   teardown for every cell of the matrix
//! - **Result store**: experiment records, schema discovery and CSV export
//! - **Plugin registry**: explicit table of benchmark factories
//! - **Deployment gateway**: the boundary to the environment backend
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use template_bench::api;
//! use template_bench::config::RunConfig;
//! use template_bench::context::RunContext;
//! use template_bench::deployment::DryRunGateway;
//! use template_bench::plugin::PluginRegistry;
//!
//! let config = RunConfig::from_json_file("run.json".as_ref())?;
//! let registry = PluginRegistry::new();
//! let ctx = RunContext::new(config, DryRunGateway::new());
//!
//! let summary = api::execute(ctx, &registry)?;
//! println!("reports in {}", summary.results_dir.display());
//! # Ok::<(), template_bench::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod api;
pub mod config;
pub mod context;
pub mod deployment;
pub mod error;
pub mod experiment;
pub mod logging;
pub mod orchestrator;
pub mod plugin;
pub mod template;

pub use error::{Error, Result};
