//! End-to-end orchestrator tests with a recording gateway and counting plugins

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::json;
use tempfile::TempDir;
use template_bench::api;
use template_bench::config::{BenchmarkSpec, RunConfig};
use template_bench::context::RunContext;
use template_bench::deployment::{DeploymentGateway, DeploymentParameters};
use template_bench::experiment::{BenchmarkOutput, DataPoint};
use template_bench::orchestrator::{Orchestrator, OrchestratorState};
use template_bench::plugin::{BenchmarkPlugin, DerivedMetrics, Features, Params, PluginRegistry};
use template_bench::Error;

// =============================================================================
// Test doubles
// =============================================================================

#[derive(Debug, Default)]
struct Calls {
    deploys: Vec<String>,
    destroys: Vec<String>,
    destroy_all: usize,
    parameters: Vec<DeploymentParameters>,
}

impl Calls {
    fn deploys_of(&self, experiment: &str) -> usize {
        self.deploys.iter().filter(|e| *e == experiment).count()
    }

    fn destroys_of(&self, experiment: &str) -> usize {
        self.destroys.iter().filter(|e| *e == experiment).count()
    }
}

struct RecordingGateway {
    calls: Rc<RefCell<Calls>>,
    fail_for: Option<String>,
}

impl RecordingGateway {
    fn new() -> (Self, Rc<RefCell<Calls>>) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let gateway = Self {
            calls: Rc::clone(&calls),
            fail_for: None,
        };
        (gateway, calls)
    }

    fn failing_for(experiment: &str) -> (Self, Rc<RefCell<Calls>>) {
        let (mut gateway, calls) = Self::new();
        gateway.fail_for = Some(experiment.to_string());
        (gateway, calls)
    }
}

impl DeploymentGateway for RecordingGateway {
    fn deploy(
        &mut self,
        template: &Path,
        experiment: &str,
        parameters: &DeploymentParameters,
    ) -> bool {
        assert!(template.ends_with(format!("{experiment}.yaml")));
        if self.fail_for.as_deref() == Some(experiment) {
            return false;
        }
        let mut calls = self.calls.borrow_mut();
        calls.deploys.push(experiment.to_string());
        calls.parameters.push(parameters.clone());
        true
    }

    fn destroy(&mut self, experiment: &str) {
        self.calls.borrow_mut().destroys.push(experiment.to_string());
    }

    fn destroy_all(&mut self) {
        self.calls.borrow_mut().destroy_all += 1;
    }
}

/// Returns `{"latency": N}` where N counts `run` calls across all instances.
struct CounterBenchmark {
    name: String,
    counter: Rc<Cell<u64>>,
    hooks: Rc<RefCell<Vec<String>>>,
    fail_run: bool,
    fail_after: Option<u64>,
}

impl BenchmarkPlugin for CounterBenchmark {
    fn name(&self) -> &str {
        &self.name
    }

    fn features(&self) -> Features {
        Features::new("Counts invocations").parameter("fail", &["true", "false"], "false")
    }

    fn initialize(&mut self) -> anyhow::Result<()> {
        self.hooks.borrow_mut().push(format!("{}:initialize", self.name));
        Ok(())
    }

    fn run(&mut self) -> anyhow::Result<BenchmarkOutput> {
        self.hooks.borrow_mut().push(format!("{}:run", self.name));
        if self.fail_run || self.fail_after == Some(self.counter.get()) {
            anyhow::bail!("traffic generator unreachable");
        }
        self.counter.set(self.counter.get() + 1);
        Ok(json!({"latency": self.counter.get()}).into())
    }

    fn finalize(&mut self) -> anyhow::Result<()> {
        self.hooks.borrow_mut().push(format!("{}:finalize", self.name));
        Ok(())
    }
}

struct PointCount;

impl DerivedMetrics for PointCount {
    fn channels(&self) -> Vec<String> {
        vec!["fingerprint".to_string()]
    }

    fn derive(
        &mut self,
        experiment: &str,
        points: &[DataPoint],
    ) -> anyhow::Result<BTreeMap<String, BenchmarkOutput>> {
        let mut out = BTreeMap::new();
        out.insert(
            "fingerprint".to_string(),
            json!({"source": experiment, "points": points.len()}).into(),
        );
        Ok(out)
    }
}

struct BrokenAnalytics;

impl DerivedMetrics for BrokenAnalytics {
    fn channels(&self) -> Vec<String> {
        vec!["fingerprint".to_string()]
    }

    fn derive(
        &mut self,
        _experiment: &str,
        _points: &[DataPoint],
    ) -> anyhow::Result<BTreeMap<String, BenchmarkOutput>> {
        anyhow::bail!("analytics down")
    }
}

struct Fixture {
    _dir: TempDir,
    templates: PathBuf,
    results: PathBuf,
    counter: Rc<Cell<u64>>,
    hooks: Rc<RefCell<Vec<String>>>,
    registry: PluginRegistry,
}

impl Fixture {
    fn new(templates: &[(&str, u32)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let template_dir = dir.path().join("templates");
        fs::create_dir(&template_dir).unwrap();
        for (name, vcpu) in templates {
            fs::write(template_dir.join(format!("{name}.yaml")), "resources: {}").unwrap();
            fs::write(
                template_dir.join(format!("{name}.yaml.json")),
                json!({"vcpu": vcpu}).to_string(),
            )
            .unwrap();
        }

        let counter = Rc::new(Cell::new(0));
        let hooks = Rc::new(RefCell::new(Vec::new()));
        let mut registry = PluginRegistry::new();
        let (c, h) = (Rc::clone(&counter), Rc::clone(&hooks));
        registry.register("counter", "CounterBenchmark", move |name: &str, params: &Params| {
            Box::new(CounterBenchmark {
                name: name.to_string(),
                counter: Rc::clone(&c),
                hooks: Rc::clone(&h),
                fail_run: params.get("fail") == Some(&json!("true")),
                fail_after: params.get("fail_after").and_then(serde_json::Value::as_u64),
            }) as Box<dyn BenchmarkPlugin>
        });

        Self {
            results: dir.path().join("results"),
            templates: template_dir,
            _dir: dir,
            counter,
            hooks,
            registry,
        }
    }

    fn config(&self, benchmarks: Vec<BenchmarkSpec>) -> RunConfig {
        RunConfig::new(&self.templates, benchmarks).results_root(&self.results)
    }
}

fn csv_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

// =============================================================================
// Full matrix
// =============================================================================

#[test]
fn test_two_templates_two_iterations() {
    let fx = Fixture::new(&[("a", 1), ("b", 2)]);
    let (gateway, calls) = RecordingGateway::new();
    let config = fx
        .config(vec![BenchmarkSpec::new("counter")])
        .iterations(2)
        .deployment_parameter("flavor", "m1.small");
    let mut orchestrator = Orchestrator::new(RunContext::new(config, gateway)).unwrap();

    orchestrator.initialize(&fx.registry).unwrap();
    orchestrator.run_benchmarks().unwrap();
    let summary = orchestrator.finalize().unwrap();

    let store = orchestrator.store();
    assert_eq!(store.experiment_count(), 2);
    assert_eq!(store.data_points("a", "counter_0").len(), 2);
    assert_eq!(store.data_points("b", "counter_0").len(), 2);
    assert_eq!(fx.counter.get(), 4);

    let calls = calls.borrow();
    for experiment in ["a", "b"] {
        assert_eq!(calls.deploys_of(experiment), 2);
        assert_eq!(calls.destroys_of(experiment), 2);
    }
    assert_eq!(calls.destroy_all, 1);
    assert_eq!(calls.parameters[0]["flavor"], "m1.small");

    assert_eq!(summary.deployments, 4);
    assert_eq!(summary.skipped_deployments, 0);
    assert_eq!(summary.data_points, 4);
    assert_eq!(summary.aggregate_reports.len(), 1);

    let lines = csv_lines(&summary.aggregate_reports[0]);
    assert_eq!(lines, vec!["vcpu;latency", "1;1", "1;3", "2;2", "2;4"]);
}

#[test]
fn test_reports_and_metadata_written() {
    let fx = Fixture::new(&[("a", 1), ("b", 2)]);
    let (gateway, _calls) = RecordingGateway::new();
    let ctx = RunContext::new(fx.config(vec![BenchmarkSpec::new("counter")]), gateway);

    let summary = api::execute(ctx, &fx.registry).unwrap();

    let dir = &summary.results_dir;
    assert!(dir.starts_with(&fx.results));
    assert!(dir.join("results_counter_0.csv").is_file());
    assert_eq!(
        csv_lines(&dir.join("a").join("counter_0.csv")),
        vec!["vcpu;latency", "1;1"]
    );

    let metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("b").join("metadata.json")).unwrap())
            .unwrap();
    assert_eq!(metadata["experiment_name"], "b");
    assert!(metadata["location"].as_str().unwrap().ends_with("metadata.json"));
}

#[test]
fn test_hook_order() {
    let fx = Fixture::new(&[("a", 1)]);
    let (gateway, _calls) = RecordingGateway::new();
    let ctx = RunContext::new(fx.config(vec![BenchmarkSpec::new("counter")]), gateway);

    api::execute(ctx, &fx.registry).unwrap();

    assert_eq!(
        *fx.hooks.borrow(),
        vec![
            "counter_0:initialize",
            "counter_0:run",
            "counter_0:finalize"
        ]
    );
}

#[test]
fn test_duplicate_benchmarks_get_unique_names() {
    let fx = Fixture::new(&[("a", 1)]);
    let (gateway, _calls) = RecordingGateway::new();
    let config = fx.config(vec![
        BenchmarkSpec::new("counter"),
        BenchmarkSpec::new("counter.CounterBenchmark"),
    ]);
    let mut orchestrator = Orchestrator::new(RunContext::new(config, gateway)).unwrap();

    orchestrator.initialize(&fx.registry).unwrap();

    assert_eq!(
        orchestrator.benchmark_names().collect::<Vec<_>>(),
        vec!["counter_0", "counter.CounterBenchmark_0"]
    );
    let config = fx.config(vec![BenchmarkSpec::new("counter"), BenchmarkSpec::new("counter")]);
    let (gateway, _calls) = RecordingGateway::new();
    let mut orchestrator = Orchestrator::new(RunContext::new(config, gateway)).unwrap();
    orchestrator.initialize(&fx.registry).unwrap();

    assert_eq!(
        orchestrator.benchmark_names().collect::<Vec<_>>(),
        vec!["counter_0", "counter_1"]
    );
    assert!(orchestrator.store().has_benchmark("a", "counter_1"));
}

// =============================================================================
// Failure semantics
// =============================================================================

#[test]
fn test_deployment_failure_skips_template() {
    let fx = Fixture::new(&[("a", 1), ("b", 2)]);
    let (gateway, calls) = RecordingGateway::failing_for("a");
    let ctx = RunContext::new(fx.config(vec![BenchmarkSpec::new("counter")]), gateway);
    let mut orchestrator = Orchestrator::new(ctx).unwrap();

    orchestrator.initialize(&fx.registry).unwrap();
    orchestrator.run_benchmarks().unwrap();
    let summary = orchestrator.finalize().unwrap();

    assert!(orchestrator.store().data_points("a", "counter_0").is_empty());
    assert_eq!(orchestrator.store().data_points("b", "counter_0").len(), 1);
    assert_eq!(summary.skipped_deployments, 1);
    assert_eq!(summary.deployments, 1);

    let calls = calls.borrow();
    assert_eq!(calls.deploys_of("a"), 0);
    assert_eq!(calls.destroys_of("a"), 0);
    assert_eq!(calls.destroys_of("b"), 1);

    // Template A keeps its configuration even without data points.
    assert_eq!(orchestrator.store().configuration("a").unwrap()["vcpu"], 1);
}

#[test]
fn test_plugin_error_still_finalizes() {
    let fx = Fixture::new(&[("a", 1), ("b", 2)]);
    let (gateway, calls) = RecordingGateway::new();
    let mut params = Params::new();
    params.insert("fail".to_string(), json!("true"));
    let ctx = RunContext::new(
        fx.config(vec![BenchmarkSpec::with_params("counter", params)]),
        gateway,
    );

    let err = api::execute(ctx, &fx.registry).unwrap_err();

    assert!(matches!(
        &err,
        Error::Plugin { benchmark, hook: "run", .. } if benchmark == "counter_0"
    ));
    assert!(err.to_string().contains("traffic generator unreachable"));
    let calls = calls.borrow();
    assert_eq!(calls.deploys_of("a"), 1);
    assert_eq!(calls.destroys_of("a"), 0);
    assert_eq!(calls.deploys_of("b"), 0);
    assert_eq!(calls.destroy_all, 1);
}

#[test]
fn test_aggregate_snapshot_survives_later_failure() {
    let fx = Fixture::new(&[("a", 1), ("b", 2)]);
    let (gateway, _calls) = RecordingGateway::new();
    let mut params = Params::new();
    params.insert("fail_after".to_string(), json!(1));
    let ctx = RunContext::new(
        fx.config(vec![BenchmarkSpec::with_params("counter", params)]),
        gateway,
    );
    let mut orchestrator = Orchestrator::new(ctx).unwrap();
    orchestrator.initialize(&fx.registry).unwrap();

    let err = orchestrator.run_benchmarks().unwrap_err();

    assert!(matches!(err, Error::Plugin { hook: "run", .. }));
    let snapshot = orchestrator.store().aggregate_csv_path("counter_0");
    assert_eq!(csv_lines(&snapshot), vec!["latency", "1"]);

    orchestrator.finalize().unwrap();
    assert_eq!(csv_lines(&snapshot), vec!["vcpu;latency", "1;1"]);
}

#[test]
fn test_failed_derivation_keeps_measured_points() {
    let fx = Fixture::new(&[("a", 1)]);
    let (gateway, calls) = RecordingGateway::new();
    let ctx = RunContext::new(fx.config(vec![BenchmarkSpec::new("counter")]), gateway)
        .with_derived_metrics(BrokenAnalytics);
    let mut orchestrator = Orchestrator::new(ctx).unwrap();
    orchestrator.initialize(&fx.registry).unwrap();

    let err = orchestrator.run_benchmarks().unwrap_err();

    assert!(matches!(err, Error::Plugin { hook: "derive", .. }));
    assert!(err.to_string().contains("analytics down"));
    let points = orchestrator.store().data_points("a", "counter_0");
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["latency"], 1);
    assert!(orchestrator.store().data_points("a", "fingerprint").is_empty());

    let summary = orchestrator.finalize().unwrap();
    assert_eq!(summary.data_points, 1);
    assert_eq!(calls.borrow().destroy_all, 1);
}

#[test]
fn test_finalize_closes_remaining_experiments_after_failure() {
    let fx = Fixture::new(&[("a", 1), ("b", 2)]);
    let (gateway, calls) = RecordingGateway::new();
    let ctx = RunContext::new(fx.config(vec![BenchmarkSpec::new("counter")]), gateway);
    let mut orchestrator = Orchestrator::new(ctx).unwrap();
    orchestrator.initialize(&fx.registry).unwrap();
    orchestrator.run_benchmarks().unwrap();

    // A plain file where experiment a's directory belongs blocks its snapshot.
    let results_dir = orchestrator.store().directory().to_path_buf();
    fs::write(results_dir.join("a"), "occupied").unwrap();

    let err = orchestrator.finalize().unwrap_err();

    assert!(matches!(err, Error::Io(_)));
    assert!(results_dir.join("b").join("metadata.json").is_file());
    assert!(results_dir.join("b").join("counter_0.csv").is_file());
    assert_eq!(
        csv_lines(&results_dir.join("results_counter_0.csv")),
        vec!["vcpu;latency", "1;1", "2;2"]
    );
    assert_eq!(calls.borrow().destroy_all, 1);
}

#[test]
fn test_unknown_plugin_fails_before_deploying() {
    let fx = Fixture::new(&[("a", 1)]);
    let (gateway, calls) = RecordingGateway::new();
    let ctx = RunContext::new(fx.config(vec![BenchmarkSpec::new("missing.Plugin")]), gateway);

    let err = api::execute(ctx, &fx.registry).unwrap_err();

    assert!(matches!(err, Error::PluginNotFound(id) if id == "missing.Plugin"));
    let calls = calls.borrow();
    assert!(calls.deploys.is_empty());
    assert_eq!(calls.destroy_all, 1);
}

#[test]
fn test_invalid_config_rejected_before_side_effects() {
    let fx = Fixture::new(&[("a", 1)]);
    let (gateway, calls) = RecordingGateway::new();
    let config = RunConfig::new(fx.templates.join("missing"), vec![BenchmarkSpec::new("counter")])
        .results_root(&fx.results);

    let err = api::execute(RunContext::new(config, gateway), &fx.registry).unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(!fx.results.exists());
    assert_eq!(calls.borrow().destroy_all, 0);
}

#[test]
fn test_missing_descriptor_aborts_run() {
    let fx = Fixture::new(&[("a", 1)]);
    fs::remove_file(fx.templates.join("a.yaml.json")).unwrap();
    let (gateway, calls) = RecordingGateway::new();
    let ctx = RunContext::new(fx.config(vec![BenchmarkSpec::new("counter")]), gateway);

    let err = api::execute(ctx, &fx.registry).unwrap_err();

    assert!(matches!(err, Error::Descriptor { .. }));
    assert!(calls.borrow().deploys.is_empty());
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_out_of_order_calls_rejected() {
    let fx = Fixture::new(&[("a", 1)]);
    let (gateway, _calls) = RecordingGateway::new();
    let ctx = RunContext::new(fx.config(vec![BenchmarkSpec::new("counter")]), gateway);
    let mut orchestrator = Orchestrator::new(ctx).unwrap();

    assert!(matches!(
        orchestrator.run_benchmarks(),
        Err(Error::InvalidState { .. })
    ));
    orchestrator.initialize(&fx.registry).unwrap();
    assert!(matches!(
        orchestrator.initialize(&fx.registry),
        Err(Error::InvalidState { .. })
    ));
    orchestrator.finalize().unwrap();
    assert_eq!(orchestrator.state(), OrchestratorState::Finalized);
    assert!(matches!(
        orchestrator.finalize(),
        Err(Error::InvalidState { .. })
    ));
}

#[test]
fn test_drop_after_run_destroys_deployments() {
    let fx = Fixture::new(&[("a", 1)]);
    let (gateway, calls) = RecordingGateway::new();
    let ctx = RunContext::new(fx.config(vec![BenchmarkSpec::new("counter")]), gateway);

    {
        let mut orchestrator = Orchestrator::new(ctx).unwrap();
        orchestrator.initialize(&fx.registry).unwrap();
        orchestrator.run_benchmarks().unwrap();
    }

    assert_eq!(calls.borrow().destroy_all, 1);
}

#[test]
fn test_derived_metric_channels() {
    let fx = Fixture::new(&[("a", 1)]);
    let (gateway, _calls) = RecordingGateway::new();
    let ctx = RunContext::new(fx.config(vec![BenchmarkSpec::new("counter")]), gateway)
        .with_derived_metrics(PointCount);
    let mut orchestrator = Orchestrator::new(ctx).unwrap();

    orchestrator.initialize(&fx.registry).unwrap();
    orchestrator.run_benchmarks().unwrap();
    let summary = orchestrator.finalize().unwrap();

    let fingerprint = orchestrator.store().data_points("a", "fingerprint");
    assert_eq!(fingerprint.len(), 1);
    assert_eq!(fingerprint[0]["source"], "a");
    assert_eq!(fingerprint[0]["points"], 1);
    assert_eq!(summary.data_points, 1);
    assert!(summary.results_dir.join("results_fingerprint.csv").is_file());
}

#[test]
fn test_available_test_cases_and_features() {
    let fx = Fixture::new(&[]);

    assert_eq!(
        api::available_test_cases(&fx.registry),
        vec!["counter.CounterBenchmark"]
    );
    let features = api::test_case_features(&fx.registry, "counter.CounterBenchmark").unwrap();
    assert_eq!(features.description, "Counts invocations");
    assert_eq!(features.parameters, vec!["fail"]);
}
