//! Scenario execution engine: parser, queue, strategies, and driver.
//!
//! Control flow: the parser consumes the interpolator and the registries to
//! build a queue of execution units; the driver iterates the queue,
//! delegating each unit to a strategy chosen by unit size; the strategy runs
//! the steps and returns an aggregate signal; the driver applies the
//! termination policy and notifies listeners at every boundary.

pub mod driver;
pub mod parser;
pub mod queue;
mod strategy;

pub use driver::ScenarioDriver;
pub use parser::ScenarioParser;
pub use queue::{DEFAULT_PARALLELISM, ExecutionUnit, StepQueue};

use crate::context::ScenarioContext;
use crate::error::ScenarioError;
use crate::listener::ListenerRegistry;
use crate::step::TerminationSignal;
use crate::step::registry::StepRegistry;
use serde_yaml::Value;

/// Parses `document` and drives the resulting queue to completion.
///
/// Convenience wrapper wiring the context, parser, and driver together the
/// way a host binary would.
pub async fn run_scenario(
    document: &Value,
    steps: &StepRegistry,
    listeners: &ListenerRegistry,
) -> Result<TerminationSignal, ScenarioError> {
    let context = ScenarioContext::new();
    let queue = ScenarioParser::new(steps, listeners, context.clone()).parse(document)?;
    ScenarioDriver::new(queue, context).drive_all().await
}
