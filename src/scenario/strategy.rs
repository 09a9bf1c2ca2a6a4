//! Execution strategies: how one unit's steps are run.
//!
//! Strategy selection is purely a function of unit size. A lone step runs
//! inline on the driving task; a parallel group runs on a bounded tokio
//! worker pool sized to the queue's `multi_process_count`. Either way the
//! driver blocks until the whole unit resolves.

use crate::context::ScenarioContext;
use crate::error::ScenarioError;
use crate::listener::Subject;
use crate::scenario::queue::ExecutionUnit;
use crate::step::{BoundStep, TerminationSignal};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tracing::{Instrument, debug, info_span, warn};

/// Outcome a worker sends back to the aggregator. `Err` carries the failing
/// step's class-local error message.
struct WorkerReport {
    class_name: String,
    outcome: Result<(), String>,
}

/// Runs one unit to completion and returns its aggregate signal.
pub(crate) async fn run_unit(
    unit: ExecutionUnit,
    parallelism: usize,
    continue_on_error: bool,
    ctx: &ScenarioContext,
) -> Result<TerminationSignal, ScenarioError> {
    let mut steps = unit.into_steps();
    if steps.len() <= 1 {
        match steps.pop() {
            Some(step) => run_single(step, ctx).await,
            None => Ok(TerminationSignal::Continue),
        }
    } else {
        run_multi(steps, parallelism, continue_on_error, ctx).await
    }
}

/// Fires a step's listener chain around its execution and returns the raw
/// result. The error hook receives the step's own error; the completion hook
/// fires on both paths.
async fn execute_bound(
    bound: &BoundStep,
    ctx: &ScenarioContext,
) -> anyhow::Result<Option<TerminationSignal>> {
    let subject = Subject::Step {
        class_name: bound.class_name(),
        symbolic_name: bound.symbolic_name(),
    };

    for listener in bound.listeners() {
        listener.before(&subject);
    }

    let result = bound.step().execute(ctx).await;

    match &result {
        Ok(_) => {
            for listener in bound.listeners() {
                listener.after(&subject);
            }
        }
        Err(error) => {
            let cause: &(dyn std::error::Error + 'static) = error.as_ref();
            for listener in bound.listeners() {
                listener.error(&subject, cause);
            }
        }
    }

    for listener in bound.listeners() {
        listener.completion(&subject);
    }

    result
}

/// Single-worker strategy: the step runs inline; any failure is caught,
/// logged, and translated into an abnormal outcome.
async fn run_single(
    bound: BoundStep,
    ctx: &ScenarioContext,
) -> Result<TerminationSignal, ScenarioError> {
    match execute_bound(&bound, ctx).await {
        Ok(Some(signal)) => Ok(signal),
        Ok(None) => Ok(TerminationSignal::Continue),
        Err(error) => {
            warn!(step = bound.class_name(), error = %error, "step failed");
            Ok(TerminationSignal::Abnormal)
        }
    }
}

/// Multi-worker strategy: one task per step, gated by a semaphore sized to
/// the queue's parallelism. Completion order is unobserved; reports arrive
/// over a channel as workers finish. A failure never interrupts in-flight
/// workers; it only decides the aggregate outcome once all have reported.
async fn run_multi(
    steps: Vec<BoundStep>,
    parallelism: usize,
    continue_on_error: bool,
    ctx: &ScenarioContext,
) -> Result<TerminationSignal, ScenarioError> {
    let total = steps.len();
    let pool = Arc::new(Semaphore::new(parallelism.max(1)));
    let (tx, mut rx) = mpsc::unbounded_channel::<WorkerReport>();

    for bound in steps {
        let pool = Arc::clone(&pool);
        let tx = tx.clone();
        let ctx = ctx.clone();
        let span = info_span!("worker", step = bound.class_name());

        tokio::spawn(
            async move {
                let permit = pool.acquire_owned().await;
                if permit.is_err() {
                    // The pool is never closed while workers exist; a closed
                    // semaphore still must not lose the report.
                    let _ = tx.send(WorkerReport {
                        class_name: bound.class_name().to_string(),
                        outcome: Err("worker pool closed".to_string()),
                    });
                    return;
                }

                let outcome = match execute_bound(&bound, &ctx).await {
                    Ok(_) => Ok(()),
                    Err(error) => {
                        warn!(step = bound.class_name(), error = %error, "worker step failed");
                        Err(format!("{error:#}"))
                    }
                };

                let _ = tx.send(WorkerReport {
                    class_name: bound.class_name().to_string(),
                    outcome,
                });
            }
            .instrument(span),
        );
    }
    drop(tx);

    let mut received = 0usize;
    let mut first_failure: Option<WorkerReport> = None;
    while let Some(report) = rx.recv().await {
        received += 1;
        if report.outcome.is_ok() {
            debug!(step = report.class_name.as_str(), "worker reported ok");
        } else if first_failure.is_none() {
            first_failure = Some(report);
        } else {
            debug!(step = report.class_name.as_str(), "additional worker failure");
        }
    }

    if received < total && first_failure.is_none() {
        // A worker that died without reporting counts as failed.
        first_failure = Some(WorkerReport {
            class_name: "<unknown>".to_string(),
            outcome: Err("worker terminated without reporting".to_string()),
        });
    }

    match first_failure {
        None => Ok(TerminationSignal::Continue),
        Some(report) if continue_on_error => {
            warn!(
                step = report.class_name.as_str(),
                "unit failure ignored: force_continue is enabled"
            );
            Ok(TerminationSignal::Continue)
        }
        Some(report) => {
            let message = report.outcome.err().unwrap_or_default();
            Err(ScenarioError::StepExecutionFailed(format!(
                "{}: {}",
                report.class_name, message
            )))
        }
    }
}
