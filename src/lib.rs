//! `scenario-kit` - a declarative scenario execution engine.
//!
//! A scenario is a flat, ordered pipeline of named operations, some of which
//! run concurrently as a group, described by a YAML or JSON document. This
//! crate turns such a document into live execution units, schedules them
//! against single- or multi-worker strategies, and enforces an observable
//! termination policy.
//!
//! What an individual step *does* (download a file, write to a database,
//! call an HTTP endpoint) is a collaborator concern: the engine only relies
//! on the [`Step`] contract and resolves class names through an explicit
//! [`StepRegistry`].
//!
//! # Example
//!
//! ```rust,ignore
//! use scenario_kit::{ListenerRegistry, StepRegistry, run_scenario};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let document: serde_yaml::Value = serde_yaml::from_str(
//!         r#"
//!         scenario:
//!           - multi_process_count: 3
//!           - step: sample
//!             class: SampleStep
//!             arguments: { retry_count: 10 }
//!           - parallel:
//!               - { class: SleepStep, arguments: { seconds: 1 } }
//!               - { class: SampleStep }
//!         "#,
//!     )?;
//!
//!     let signal = run_scenario(
//!         &document,
//!         &StepRegistry::new(),
//!         &ListenerRegistry::new(),
//!     )
//!     .await?;
//!     std::process::exit(signal.exit_code());
//! }
//! ```

pub mod context;
pub mod error;
pub mod listener;
pub mod scenario;
pub mod step;
pub mod template;

pub use context::ScenarioContext;
pub use error::ScenarioError;
pub use listener::{Listener, ListenerFactory, ListenerRegistry, LogListener, Subject};
pub use scenario::{
    DEFAULT_PARALLELISM, ExecutionUnit, ScenarioDriver, ScenarioParser, StepQueue, run_scenario,
};
pub use step::registry::{StepFactory, StepNamespace, StepRegistry};
pub use step::{BoundStep, Step, StepArgs, TerminationSignal};
pub use template::{CommandVars, interpolate};
