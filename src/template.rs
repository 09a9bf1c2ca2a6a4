//! Placeholder interpolation for scenario argument values.
//!
//! Argument values may embed `{{ name }}` placeholders anywhere inside a
//! nested document. Bare names resolve from a caller-supplied substitution
//! table (typically the captured output of `with_vars` shell commands), and
//! `env.NAME` resolves from the process environment. Placeholder bodies are
//! validated up front so resolution failures carry the offending name rather
//! than a generic rendering error.

use crate::error::ScenarioError;
use minijinja::{Environment, UndefinedBehavior};
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::process::Command;
use std::sync::OnceLock;

const ENV_PREFIX: &str = "env.";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{([^{}]*)\}\}").expect("placeholder pattern is a valid regex")
    })
}

/// Replaces every `{{ name }}` placeholder inside `value`, preserving shape.
///
/// Mappings and sequences are walked recursively; non-string scalars pass
/// through untouched. A value containing no placeholders is returned
/// unchanged. A string leaf that consists of exactly one placeholder may
/// yield a structured (non-string) value when the substitution itself is a
/// YAML mapping or sequence.
pub fn interpolate(
    value: &Value,
    vars: &HashMap<String, String>,
) -> Result<Value, ScenarioError> {
    match value {
        Value::Mapping(mapping) => {
            let mut out = Mapping::with_capacity(mapping.len());
            for (key, entry) in mapping {
                out.insert(key.clone(), interpolate(entry, vars)?);
            }
            Ok(Value::Mapping(out))
        }
        Value::Sequence(entries) => {
            let mut out = Vec::with_capacity(entries.len());
            for entry in entries {
                out.push(interpolate(entry, vars)?);
            }
            Ok(Value::Sequence(out))
        }
        Value::String(text) => interpolate_scalar(text, vars),
        other => Ok(other.clone()),
    }
}

fn interpolate_scalar(
    text: &str,
    vars: &HashMap<String, String>,
) -> Result<Value, ScenarioError> {
    if !placeholder_pattern().is_match(text) {
        return Ok(Value::String(text.to_string()));
    }

    let context = render_context(text, vars)?;
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    let rendered = env
        .render_str(text, &context)
        .map_err(|e| ScenarioError::Template(e.to_string()))?;

    // A leaf made of a single placeholder may carry structured data.
    if is_single_placeholder(text) {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(&rendered) {
            if matches!(parsed, Value::Mapping(_) | Value::Sequence(_)) {
                return Ok(parsed);
            }
        }
    }

    Ok(Value::String(rendered))
}

/// Validates every placeholder body in `text` and builds the substitution
/// context: bare names plus an `env` object holding referenced variables.
fn render_context(
    text: &str,
    vars: &HashMap<String, String>,
) -> Result<serde_json::Value, ScenarioError> {
    let mut root = serde_json::Map::new();
    let mut env_entries = serde_json::Map::new();

    for capture in placeholder_pattern().captures_iter(text) {
        let body = capture[1].trim();
        if body.is_empty() {
            return Err(ScenarioError::InvalidParameter(
                "placeholder with an empty body".to_string(),
            ));
        }
        if let Some(name) = body.strip_prefix(ENV_PREFIX) {
            let value = std::env::var(name)
                .map_err(|_| ScenarioError::MissingEnvironmentVariable(name.to_string()))?;
            env_entries.insert(name.to_string(), serde_json::Value::String(value));
        } else {
            let value = vars
                .get(body)
                .ok_or_else(|| ScenarioError::UndefinedVariable(body.to_string()))?;
            root.insert(body.to_string(), serde_json::Value::String(value.clone()));
        }
    }

    root.insert("env".to_string(), serde_json::Value::Object(env_entries));
    Ok(serde_json::Value::Object(root))
}

fn is_single_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    placeholder_pattern()
        .find(trimmed)
        .is_some_and(|found| found.start() == 0 && found.end() == trimmed.len())
}

/// Runs `with_vars` shell commands and captures their output.
///
/// Each distinct command line runs at most once per parse pass; separate
/// passes re-run their commands so values stay fresh between runs.
#[derive(Debug, Default)]
pub struct CommandVars {
    outputs: HashMap<String, String>,
}

impl CommandVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the declared `(name, command)` pairs into a substitution
    /// table of name → captured output.
    pub fn resolve(
        &mut self,
        declared: &[(String, String)],
    ) -> Result<HashMap<String, String>, ScenarioError> {
        let mut table = HashMap::with_capacity(declared.len());
        for (name, command) in declared {
            let value = match self.outputs.get(command) {
                Some(cached) => cached.clone(),
                None => {
                    let fresh = run_command(name, command)?;
                    self.outputs.insert(command.clone(), fresh.clone());
                    fresh
                }
            };
            table.insert(name.clone(), value);
        }
        Ok(table)
    }
}

fn run_command(name: &str, command: &str) -> Result<String, ScenarioError> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .map_err(|e| ScenarioError::CommandFailed {
            name: name.to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ScenarioError::CommandFailed {
            name: name.to_string(),
            message: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(clean_output(&String::from_utf8_lossy(&output.stdout)))
}

/// Strips trailing whitespace and one symmetric pair of surrounding quotes.
fn clean_output(raw: &str) -> String {
    let trimmed = raw.trim_end();
    let quoted = (trimmed.starts_with('"') && trimmed.ends_with('"'))
        || (trimmed.starts_with('\'') && trimmed.ends_with('\''));
    if quoted && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).expect("test document parses")
    }

    #[test]
    fn value_without_placeholders_is_unchanged() {
        let value = yaml("{a: [1, {b: plain}], c: true}");
        let result = interpolate(&value, &HashMap::new()).expect("interpolation succeeds");
        assert_eq!(result, value);
    }

    #[test]
    fn nested_round_trip() {
        let value = yaml(r#"{a: ["{{x}}", {b: "{{y}}"}]}"#);
        let result = interpolate(&value, &vars(&[("x", "1"), ("y", "2")])).expect("interpolates");
        assert_eq!(result, yaml(r#"{a: ["1", {b: "2"}]}"#));
    }

    #[test]
    fn placeholder_inside_larger_string() {
        let value = yaml(r#"memo: "foo_{{ today }}.csv""#);
        let result = interpolate(&value, &vars(&[("today", "20260829")])).expect("interpolates");
        assert_eq!(result, yaml("memo: foo_20260829.csv"));
    }

    #[test]
    fn single_placeholder_leaf_can_become_structured() {
        let value = yaml(r#"items: "{{ listing }}""#);
        let result =
            interpolate(&value, &vars(&[("listing", "[alpha, beta]")])).expect("interpolates");
        assert_eq!(result, yaml("items: [alpha, beta]"));
    }

    #[test]
    fn scalar_substitution_stays_a_string() {
        let value = yaml(r#"count: "{{ n }}""#);
        let result = interpolate(&value, &vars(&[("n", "10")])).expect("interpolates");
        assert_eq!(result, yaml(r#"count: "10""#));
    }

    #[test]
    fn env_placeholder_resolves_from_process_environment() {
        // PATH is always present in a test environment.
        let value = Value::String("{{ env.PATH }}".to_string());
        let result = interpolate(&value, &HashMap::new()).expect("interpolates");
        let expected = std::env::var("PATH").expect("PATH is set");
        assert_eq!(result, Value::String(expected));
    }

    #[test]
    fn missing_environment_variable_is_reported_by_name() {
        let value = Value::String("{{ env.SCENARIO_KIT_UNSET_VAR }}".to_string());
        let err = interpolate(&value, &HashMap::new()).expect_err("must fail");
        match err {
            ScenarioError::MissingEnvironmentVariable(name) => {
                assert_eq!(name, "SCENARIO_KIT_UNSET_VAR");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn undefined_bare_name_is_reported_by_name() {
        let value = Value::String("{{ nowhere }}".to_string());
        let err = interpolate(&value, &HashMap::new()).expect_err("must fail");
        match err {
            ScenarioError::UndefinedVariable(name) => assert_eq!(name, "nowhere"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_placeholder_body_is_invalid() {
        let value = Value::String("{{ }}".to_string());
        let err = interpolate(&value, &HashMap::new()).expect_err("must fail");
        assert!(matches!(err, ScenarioError::InvalidParameter(_)));
    }

    #[test]
    fn command_vars_capture_and_clean_output() {
        let mut commands = CommandVars::new();
        let declared = vec![
            ("plain".to_string(), "printf 'hello\\n'".to_string()),
            ("quoted".to_string(), "printf '\"wrapped\"'".to_string()),
        ];
        let table = commands.resolve(&declared).expect("commands run");
        assert_eq!(table["plain"], "hello");
        assert_eq!(table["quoted"], "wrapped");
    }

    #[test]
    fn command_vars_memoize_within_a_pass() {
        let dir = tempfile::tempdir().expect("tempdir");
        let counter = dir.path().join("count");
        let command = format!("echo x >> {} && wc -l < {}", counter.display(), counter.display());

        let mut commands = CommandVars::new();
        let first = commands
            .resolve(&[("n".to_string(), command.clone())])
            .expect("first resolve");
        let second = commands
            .resolve(&[("n".to_string(), command.clone())])
            .expect("second resolve");
        // Same pass: the command ran once, so both reads see one line.
        assert_eq!(first["n"].trim(), "1");
        assert_eq!(second["n"].trim(), "1");

        // A fresh pass re-runs the command.
        let mut fresh = CommandVars::new();
        let third = fresh
            .resolve(&[("n".to_string(), command)])
            .expect("third resolve");
        assert_eq!(third["n"].trim(), "2");
    }

    #[test]
    fn failing_command_is_reported() {
        let mut commands = CommandVars::new();
        let err = commands
            .resolve(&[("bad".to_string(), "exit 3".to_string())])
            .expect_err("must fail");
        match err {
            ScenarioError::CommandFailed { name, .. } => assert_eq!(name, "bad"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
