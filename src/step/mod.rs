//! The step contract and runtime step bindings.
//!
//! The engine is agnostic about what a step does. The only contract is
//! [`Step::execute`], run exactly once per constructed instance: a step is
//! created during parse-time materialization, executed by a strategy, then
//! discarded. Never reused across runs.

pub mod builtin;
pub mod registry;

use crate::context::ScenarioContext;
use crate::error::ScenarioError;
use crate::listener::Listener;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::sync::Arc;

/// Aggregate outcome of a step, a unit, or a whole scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// No opinion; the driver keeps consuming the queue.
    Continue,
    /// Request a clean early stop.
    Success,
    /// A failure occurred.
    Abnormal,
}

impl TerminationSignal {
    /// Process exit code a host binary should report for this signal.
    pub fn exit_code(self) -> i32 {
        match self {
            TerminationSignal::Abnormal => 1,
            TerminationSignal::Continue | TerminationSignal::Success => 0,
        }
    }
}

/// A single executable operation in a scenario.
///
/// Errors returned from `execute` are opaque to the engine: the executing
/// strategy catches them, logs them, and translates them into an abnormal
/// unit outcome. `Ok(None)` means the step has no opinion about scenario
/// termination and is treated as [`TerminationSignal::Continue`].
#[async_trait]
pub trait Step: Send + Sync {
    /// Class name used for log scoping and diagnostics.
    fn class_name(&self) -> &'static str;

    /// Runs the step once.
    async fn execute(
        &self,
        ctx: &ScenarioContext,
    ) -> anyhow::Result<Option<TerminationSignal>>;
}

/// Everything a step factory receives during materialization: the step's
/// interpolated arguments and the driver-owned context to inject.
#[derive(Debug, Clone)]
pub struct StepArgs {
    arguments: Mapping,
    context: ScenarioContext,
}

impl StepArgs {
    pub fn new(arguments: Mapping, context: ScenarioContext) -> Self {
        Self { arguments, context }
    }

    /// Deserializes the bound arguments into the step's own argument struct.
    ///
    /// Missing keys fall back to the struct's serde defaults, so a spec
    /// without `arguments` still constructs.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ScenarioError> {
        serde_yaml::from_value(Value::Mapping(self.arguments.clone()))
            .map_err(|e| ScenarioError::InvalidParameter(e.to_string()))
    }

    pub fn arguments(&self) -> &Mapping {
        &self.arguments
    }

    pub fn context(&self) -> &ScenarioContext {
        &self.context
    }
}

/// A materialized step with everything the strategies need to run it:
/// the live instance, its identity for diagnostics, and its listener chain
/// (standard logging listener first, user listeners after).
pub struct BoundStep {
    step: Arc<dyn Step>,
    class_name: String,
    symbolic_name: Option<String>,
    listeners: Vec<Arc<dyn Listener>>,
}

impl BoundStep {
    pub fn new(
        step: Arc<dyn Step>,
        class_name: impl Into<String>,
        symbolic_name: Option<String>,
        listeners: Vec<Arc<dyn Listener>>,
    ) -> Self {
        Self {
            step,
            class_name: class_name.into(),
            symbolic_name,
            listeners,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn symbolic_name(&self) -> Option<&str> {
        self.symbolic_name.as_deref()
    }

    pub(crate) fn step(&self) -> &dyn Step {
        self.step.as_ref()
    }

    pub(crate) fn listeners(&self) -> &[Arc<dyn Listener>] {
        &self.listeners
    }
}

impl fmt::Debug for BoundStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundStep")
            .field("class_name", &self.class_name)
            .field("symbolic_name", &self.symbolic_name)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
