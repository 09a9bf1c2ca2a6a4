//! The scenario driver: drains the queue and applies termination policy.

use crate::context::ScenarioContext;
use crate::error::ScenarioError;
use crate::listener::{Listener, LogListener, Subject};
use crate::scenario::queue::StepQueue;
use crate::scenario::strategy;
use crate::step::TerminationSignal;
use std::sync::Arc;
use tracing::{Instrument, info, info_span, warn};

/// Drive-loop state. The driver starts `Running` and stops on the first
/// `Success` or `Abnormal` unit outcome, or when the queue drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Running,
    Stopped,
}

/// Pops units off the queue in order, dispatches each to an execution
/// strategy, and decides whether the scenario continues or halts.
///
/// A single driving task advances the queue strictly sequentially; any
/// concurrency lives inside a unit, behind the strategy boundary.
pub struct ScenarioDriver {
    queue: StepQueue,
    context: ScenarioContext,
    listeners: Vec<Arc<dyn Listener>>,
    state: DriverState,
}

impl ScenarioDriver {
    pub fn new(queue: StepQueue, context: ScenarioContext) -> Self {
        Self {
            queue,
            context,
            listeners: vec![Arc::new(LogListener)],
            state: DriverState::Running,
        }
    }

    /// Registers a scenario-level listener, notified around the drive loop.
    pub fn add_listener(&mut self, listener: Arc<dyn Listener>) {
        self.listeners.push(listener);
    }

    pub fn context(&self) -> &ScenarioContext {
        &self.context
    }

    /// Drains the queue, returning the scenario's final termination signal.
    ///
    /// Listeners are notified `before` draining starts, `after` on a clean
    /// finish, `error` when the fail-fast policy raises, and `completion`
    /// on every exit path.
    pub async fn drive_all(&mut self) -> Result<TerminationSignal, ScenarioError> {
        let subject = Subject::Scenario;
        for listener in &self.listeners {
            listener.before(&subject);
        }

        let result = self.drain().instrument(info_span!("scenario")).await;

        match &result {
            Ok(_) => {
                for listener in &self.listeners {
                    listener.after(&subject);
                }
            }
            Err(error) => {
                for listener in &self.listeners {
                    listener.error(&subject, error);
                }
            }
        }
        for listener in &self.listeners {
            listener.completion(&subject);
        }

        result
    }

    async fn drain(&mut self) -> Result<TerminationSignal, ScenarioError> {
        while self.state == DriverState::Running {
            let Some(unit) = self.queue.pop() else {
                // Queue exhausted while still running: the scenario succeeded.
                self.state = DriverState::Stopped;
                return Ok(TerminationSignal::Success);
            };

            let outcome = strategy::run_unit(
                unit,
                self.queue.parallelism,
                self.queue.continue_on_error,
                &self.context,
            )
            .await;

            let signal = match outcome {
                Ok(signal) => signal,
                Err(error) => {
                    self.state = DriverState::Stopped;
                    return Err(error);
                }
            };

            match signal {
                TerminationSignal::Continue => {}
                TerminationSignal::Success => {
                    info!("scenario requested an early clean stop");
                    self.state = DriverState::Stopped;
                    return Ok(TerminationSignal::Success);
                }
                TerminationSignal::Abnormal => {
                    warn!("unit ended abnormally; stopping the scenario");
                    self.state = DriverState::Stopped;
                    return Ok(TerminationSignal::Abnormal);
                }
            }
        }

        Ok(TerminationSignal::Success)
    }
}
