//! Integration tests for scenario parsing.
//!
//! These cover the document → queue path: block classification, directive
//! handling, argument interpolation, and parse-abort behavior.

use scenario_kit::{
    ListenerRegistry, ScenarioContext, ScenarioError, ScenarioParser, Step, StepNamespace,
    StepRegistry, TerminationSignal,
};
use serde_yaml::{Mapping, Value};
use std::sync::{Arc, Mutex};

/// Step that records the argument mapping it was constructed with.
struct ProbeStep;

#[async_trait::async_trait]
impl Step for ProbeStep {
    fn class_name(&self) -> &'static str {
        "ProbeStep"
    }

    async fn execute(
        &self,
        _ctx: &ScenarioContext,
    ) -> anyhow::Result<Option<TerminationSignal>> {
        Ok(None)
    }
}

fn registry_with_probe(seen: Arc<Mutex<Vec<Mapping>>>) -> StepRegistry {
    let mut registry = StepRegistry::new();
    let mut project = StepNamespace::new("project");
    project.register("ProbeStep", move |args| {
        seen.lock().expect("lock").push(args.arguments().clone());
        Ok(Arc::new(ProbeStep) as Arc<dyn Step>)
    });
    registry.add_project_namespace(project);
    registry
}

fn parse_with(
    registry: &StepRegistry,
    document: &str,
) -> Result<scenario_kit::StepQueue, ScenarioError> {
    let value: Value = serde_yaml::from_str(document).expect("test document parses");
    let listeners = ListenerRegistry::new();
    ScenarioParser::new(registry, &listeners, ScenarioContext::new()).parse(&value)
}

#[test]
fn defaults_hold_without_directives() {
    let registry = StepRegistry::new();
    let queue = parse_with(
        &registry,
        "scenario:
           - {class: SampleStep}
           - {class: SampleStep}",
    )
    .expect("parses");

    assert_eq!(queue.parallelism, 2);
    assert!(!queue.continue_on_error);
    assert_eq!(queue.len(), 2);
}

#[test]
fn step_without_arguments_constructs_with_defaults() {
    let registry = StepRegistry::new();
    let queue = parse_with(&registry, "scenario: [{class: SampleStep}]").expect("parses");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.peek().expect("unit").len(), 1);
}

#[test]
fn directives_and_parallel_group_shape_the_queue() {
    let registry = StepRegistry::new();
    let queue = parse_with(
        &registry,
        "scenario:
           - multi_process_count: 3
           - force_continue: true
           - parallel:
               - {class: SampleStep}
               - {class: SleepStep, arguments: {seconds: 0}}",
    )
    .expect("parses");

    assert_eq!(queue.parallelism, 3);
    assert!(queue.continue_on_error);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.peek().expect("unit").len(), 2);
}

#[test]
fn with_vars_interpolates_and_is_removed_from_arguments() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = registry_with_probe(Arc::clone(&seen));

    parse_with(
        &registry,
        r#"scenario:
             - class: ProbeStep
               arguments:
                 memo: "foo_{{ today }}.csv"
                 with_vars: {today: "echo 20260829"}"#,
    )
    .expect("parses");

    let seen = seen.lock().expect("lock");
    let arguments = seen.first().expect("probe constructed");
    assert_eq!(
        arguments.get("memo").and_then(Value::as_str),
        Some("foo_20260829.csv")
    );
    assert!(arguments.get("with_vars").is_none());
}

#[test]
fn identical_commands_resolve_once_per_pass() {
    let dir = tempfile::tempdir().expect("tempdir");
    let counter = dir.path().join("count");
    let command = format!(
        "echo x >> {} && wc -l < {}",
        counter.display(),
        counter.display()
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let registry = registry_with_probe(Arc::clone(&seen));

    let document = format!(
        r#"scenario:
             - class: ProbeStep
               arguments:
                 first: "{{{{ n }}}}"
                 with_vars: {{n: "{command}"}}
             - class: ProbeStep
               arguments:
                 second: "{{{{ n }}}}"
                 with_vars: {{n: "{command}"}}"#
    );
    parse_with(&registry, &document).expect("parses");

    let seen = seen.lock().expect("lock");
    let first = seen[0].get("first").and_then(Value::as_str).expect("bound");
    let second = seen[1].get("second").and_then(Value::as_str).expect("bound");
    // One pass: the command ran once, so both steps observed the same value.
    assert_eq!(first, "1");
    assert_eq!(second, "1");
}

#[test]
fn unresolvable_class_aborts_before_any_unit_is_pushed() {
    let registry = StepRegistry::new();
    let err = parse_with(
        &registry,
        "scenario:
           - {class: SampleStep}
           - {class: DownloadFromMars}",
    )
    .expect_err("must fail");

    match err {
        ScenarioError::UnknownStepClass(name) => assert_eq!(name, "DownloadFromMars"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_top_level_is_rejected() {
    let registry = StepRegistry::new();
    let err = parse_with(&registry, "pipeline: []").expect_err("must fail");
    assert!(matches!(err, ScenarioError::ScenarioFormatInvalid(_)));
}
