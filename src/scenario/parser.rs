//! Converts a deserialized scenario document into an executable queue.
//!
//! The document arrives already parsed from YAML or JSON; both share one
//! schema and land in the same `serde_yaml::Value` shape. Each top-level
//! element becomes exactly one block: a directive, a step spec, or a
//! parallel group. Any error aborts the whole parse; no partial queue is
//! ever returned.

use crate::context::ScenarioContext;
use crate::error::ScenarioError;
use crate::listener::{Listener, ListenerRegistry, LogListener};
use crate::scenario::queue::{ExecutionUnit, StepQueue};
use crate::step::registry::StepRegistry;
use crate::step::{BoundStep, StepArgs};
use crate::template::{CommandVars, interpolate};
use serde_yaml::{Mapping, Value};
use std::sync::Arc;

const SCENARIO_KEY: &str = "scenario";
const STEP_NAME_KEY: &str = "step";
const CLASS_KEY: &str = "class";
const ARGUMENTS_KEY: &str = "arguments";
const LISTENERS_KEY: &str = "listeners";
const WITH_VARS_KEY: &str = "with_vars";
const PARALLELISM_KEY: &str = "multi_process_count";
const CONTINUE_KEY: &str = "force_continue";
const PARALLEL_KEY: &str = "parallel";
const PARALLEL_WITH_CONFIG_KEY: &str = "parallel_with_config";
const CONFIG_KEY: &str = "config";
const STEPS_KEY: &str = "steps";

/// Builds a [`StepQueue`] from a raw scenario document.
///
/// The parser resolves step and listener classes through the registries and
/// materializes each step with the driver's context injected; it keeps no
/// execution state of its own. `with_vars` shell commands run during the
/// parse, memoized per pass so identical commands resolve to one value
/// within a document while separate parses see fresh output.
pub struct ScenarioParser<'a> {
    steps: &'a StepRegistry,
    listeners: &'a ListenerRegistry,
    context: ScenarioContext,
}

impl<'a> ScenarioParser<'a> {
    pub fn new(
        steps: &'a StepRegistry,
        listeners: &'a ListenerRegistry,
        context: ScenarioContext,
    ) -> Self {
        Self {
            steps,
            listeners,
            context,
        }
    }

    /// Parses `document` into a queue of execution units.
    pub fn parse(&self, document: &Value) -> Result<StepQueue, ScenarioError> {
        let blocks = scenario_blocks(document)?;
        let mut queue = StepQueue::new();
        let mut commands = CommandVars::new();

        for block in blocks {
            self.parse_block(block, &mut queue, &mut commands)?;
        }

        Ok(queue)
    }

    fn parse_block(
        &self,
        block: &Value,
        queue: &mut StepQueue,
        commands: &mut CommandVars,
    ) -> Result<(), ScenarioError> {
        if let Some(count) = block.get(PARALLELISM_KEY) {
            queue.parallelism = parse_uint(count, PARALLELISM_KEY)?;
            return Ok(());
        }

        if let Some(flag) = block.get(CONTINUE_KEY) {
            queue.continue_on_error = flag.as_bool().ok_or_else(|| {
                format_invalid(format!("'{CONTINUE_KEY}' must be a boolean"))
            })?;
            return Ok(());
        }

        if let Some(members) = block.get(PARALLEL_KEY) {
            queue.push(self.parse_group(members, commands)?);
            return Ok(());
        }

        if let Some(configured) = block.get(PARALLEL_WITH_CONFIG_KEY) {
            if let Some(count) = configured
                .get(CONFIG_KEY)
                .and_then(|config| config.get(PARALLELISM_KEY))
            {
                queue.parallelism = parse_uint(count, PARALLELISM_KEY)?;
            }
            let members = configured.get(STEPS_KEY).ok_or_else(|| {
                format_invalid(format!(
                    "'{PARALLEL_WITH_CONFIG_KEY}' requires a '{STEPS_KEY}' sequence"
                ))
            })?;
            queue.push(self.parse_group(members, commands)?);
            return Ok(());
        }

        let bound = self.parse_step(block, commands)?;
        queue.push(ExecutionUnit::single(bound));
        Ok(())
    }

    fn parse_group(
        &self,
        members: &Value,
        commands: &mut CommandVars,
    ) -> Result<ExecutionUnit, ScenarioError> {
        let members = members.as_sequence().ok_or_else(|| {
            format_invalid("a parallel group must be a sequence of step specs")
        })?;
        if members.is_empty() {
            return Err(format_invalid("a parallel group must contain at least one step"));
        }

        let steps = members
            .iter()
            .map(|member| self.parse_step(member, commands))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ExecutionUnit::new(steps))
    }

    fn parse_step(
        &self,
        spec: &Value,
        commands: &mut CommandVars,
    ) -> Result<BoundStep, ScenarioError> {
        let class_name = spec
            .get(CLASS_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| format_invalid("class is not specified"))?;
        let factory = self.steps.resolve(class_name)?;

        let mut arguments = match spec.get(ARGUMENTS_KEY) {
            Some(value) => value.as_mapping().cloned().ok_or_else(|| {
                format_invalid(format!(
                    "'{ARGUMENTS_KEY}' for {class_name} must be a mapping"
                ))
            })?,
            None => Mapping::new(),
        };

        // with_vars is consumed here; it never reaches the step itself.
        let declared = take_with_vars(&mut arguments)?;
        let vars = commands.resolve(&declared)?;
        let arguments = match interpolate(&Value::Mapping(arguments), &vars)? {
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(ScenarioError::Template(
                    "argument interpolation changed the document shape".to_string(),
                ));
            }
        };

        let symbolic_name = spec
            .get(STEP_NAME_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(name) = &symbolic_name {
            // Bound-argument snapshot for later producer/consumer lookups.
            self.context
                .publish(name.clone(), Value::Mapping(arguments.clone()));
        }

        let step = factory(StepArgs::new(arguments, self.context.clone()))?;

        let mut listeners: Vec<Arc<dyn Listener>> = vec![Arc::new(LogListener)];
        listeners.extend(self.parse_listeners(spec)?);

        Ok(BoundStep::new(step, class_name, symbolic_name, listeners))
    }

    fn parse_listeners(&self, spec: &Value) -> Result<Vec<Arc<dyn Listener>>, ScenarioError> {
        match spec.get(LISTENERS_KEY) {
            None => Ok(Vec::new()),
            Some(Value::String(name)) => Ok(vec![self.listeners.resolve(name)?]),
            Some(Value::Sequence(names)) => names
                .iter()
                .map(|entry| {
                    entry
                        .as_str()
                        .ok_or_else(|| {
                            format_invalid("listener entries must be class names")
                        })
                        .and_then(|name| self.listeners.resolve(name))
                })
                .collect(),
            Some(_) => Err(format_invalid(
                "'listeners' must be a class name or a sequence of class names",
            )),
        }
    }
}

fn scenario_blocks(document: &Value) -> Result<&[Value], ScenarioError> {
    document
        .get(SCENARIO_KEY)
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .ok_or_else(|| {
            format_invalid(format!(
                "the top-level document must bind '{SCENARIO_KEY}' to a sequence"
            ))
        })
}

fn take_with_vars(arguments: &mut Mapping) -> Result<Vec<(String, String)>, ScenarioError> {
    let Some(raw) = arguments.remove(WITH_VARS_KEY) else {
        return Ok(Vec::new());
    };
    let mapping = raw.as_mapping().ok_or_else(|| {
        ScenarioError::InvalidParameter(format!(
            "'{WITH_VARS_KEY}' must map variable names to shell commands"
        ))
    })?;

    mapping
        .iter()
        .map(|(key, value)| {
            let name = key.as_str().ok_or_else(|| {
                ScenarioError::InvalidParameter(format!(
                    "'{WITH_VARS_KEY}' keys must be strings"
                ))
            })?;
            let command = value.as_str().ok_or_else(|| {
                ScenarioError::InvalidParameter(format!(
                    "'{WITH_VARS_KEY}' entry '{name}' must be a shell command string"
                ))
            })?;
            Ok((name.to_string(), command.to_string()))
        })
        .collect()
}

fn parse_uint(value: &Value, key: &str) -> Result<usize, ScenarioError> {
    value
        .as_u64()
        .map(|count| count as usize)
        .ok_or_else(|| format_invalid(format!("'{key}' must be an unsigned integer")))
}

fn format_invalid(message: impl Into<String>) -> ScenarioError {
    ScenarioError::ScenarioFormatInvalid(message.into())
}
