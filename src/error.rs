//! Error types for the scenario engine.

use thiserror::Error;

/// Errors produced while building or driving a scenario.
///
/// Parse-time errors abort scenario construction entirely; no partial queue
/// is ever run. Execution-time step failures are caught per worker and only
/// surface here as [`ScenarioError::StepExecutionFailed`] when the fail-fast
/// policy is in effect.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The document does not have the expected top-level shape, or a step
    /// block is missing its `class` key.
    #[error("scenario format is invalid: {0}")]
    ScenarioFormatInvalid(String),

    /// No registered factory matches the declared step class name.
    #[error("unknown step class: {0}")]
    UnknownStepClass(String),

    /// No registered factory matches the declared listener class name.
    #[error("unknown listener class: {0}")]
    UnknownListenerClass(String),

    /// An `env.*` placeholder referenced an unset environment variable.
    #[error("missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    /// A bare placeholder name has no entry in the substitution table.
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    /// An empty placeholder body, or an argument value a step cannot accept.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Aggregate failure of an execution unit under the fail-fast policy.
    #[error("step execution failed: {0}")]
    StepExecutionFailed(String),

    /// A `with_vars` shell command could not be run or exited non-zero.
    #[error("command for variable '{name}' failed: {message}")]
    CommandFailed { name: String, message: String },

    /// Template rendering failed for a reason not covered above.
    #[error("template error: {0}")]
    Template(String),

    /// Document (de)serialization error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
