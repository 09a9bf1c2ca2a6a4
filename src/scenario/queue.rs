//! The execution queue: materialized units plus queue-scoped settings.

use crate::step::BoundStep;
use std::collections::VecDeque;

/// Worker-pool size used when no `multi_process_count` directive appears.
pub const DEFAULT_PARALLELISM: usize = 2;

/// One schedulable item: a single step or a parallel group of steps.
///
/// The queue exclusively owns its units; once popped, a unit is exclusively
/// owned by the strategy executing it. Steps are never shared across units.
#[derive(Debug)]
pub struct ExecutionUnit {
    steps: Vec<BoundStep>,
}

impl ExecutionUnit {
    pub fn new(steps: Vec<BoundStep>) -> Self {
        Self { steps }
    }

    pub fn single(step: BoundStep) -> Self {
        Self { steps: vec![step] }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[BoundStep] {
        &self.steps
    }

    pub(crate) fn into_steps(self) -> Vec<BoundStep> {
        self.steps
    }
}

/// FIFO sequence of execution units plus queue-wide execution settings.
///
/// Directives encountered during parsing mutate `parallelism` and
/// `continue_on_error` as they appear (last directive of a kind wins). Once
/// the driver starts consuming the queue the settings are effectively
/// frozen: single writer during parse, single reader during drive.
#[derive(Debug)]
pub struct StepQueue {
    units: VecDeque<ExecutionUnit>,
    pub parallelism: usize,
    pub continue_on_error: bool,
}

impl StepQueue {
    pub fn new() -> Self {
        Self {
            units: VecDeque::new(),
            parallelism: DEFAULT_PARALLELISM,
            continue_on_error: false,
        }
    }

    pub fn push(&mut self, unit: ExecutionUnit) {
        self.units.push_back(unit);
    }

    pub fn pop(&mut self) -> Option<ExecutionUnit> {
        self.units.pop_front()
    }

    pub fn peek(&self) -> Option<&ExecutionUnit> {
        self.units.front()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl Default for StepQueue {
    fn default() -> Self {
        Self::new()
    }
}
