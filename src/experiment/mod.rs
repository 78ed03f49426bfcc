//! Experiment results: records, reports and the result store
//!
//! ## Schema Overview
//!
//! ```text
//! ResultStore (1) ──< ExperimentRecord (N)      one per template
//!                          │
//!                          ├── metadata / configuration
//!                          └──< BenchmarkSeries (N) ──< DataPoint (N)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use serde_json::json;
//! use template_bench::experiment::ResultStore;
//!
//! # fn main() -> template_bench::Result<()> {
//! let dir = std::env::temp_dir().join("template-bench-doc");
//! let mut store = ResultStore::new(&dir)?;
//!
//! store.create_experiment("case1");
//! store.add_benchmark("case1", "throughput_0");
//! store.add_data_points("case1", "throughput_0", json!({"latency": 12}))?;
//!
//! let report = store.aggregate_report("throughput_0");
//! assert_eq!(report.rows().len(), 1);
//! # Ok(())
//! # }
//! ```

mod data_point;
mod experiment_record;
mod report;
mod store;

pub use data_point::{BenchmarkOutput, DataPoint};
pub use experiment_record::{BenchmarkSeries, ExperimentRecord, ExperimentRecordBuilder};
pub use report::{derive_columns, materialize_rows, render_value, Report, MISSING_VALUE};
pub use store::{ResultStore, LOCATION_KEY, METADATA_FILE};
