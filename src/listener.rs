//! Lifecycle notification hooks around scenarios and steps.
//!
//! Listeners observe execution boundaries for logging and other side
//! channels; they carry no business logic. A listener that needs extra data
//! receives it at construction through its factory, never through ambient
//! mutation.

use crate::error::ScenarioError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// The entity a lifecycle notification refers to.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    /// The whole scenario run.
    Scenario,
    /// A single step, identified by class name and optional symbolic name.
    Step {
        class_name: &'a str,
        symbolic_name: Option<&'a str>,
    },
}

impl fmt::Display for Subject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Scenario => write!(f, "scenario"),
            Subject::Step {
                class_name,
                symbolic_name: Some(name),
            } => write!(f, "step {class_name} ({name})"),
            Subject::Step {
                class_name,
                symbolic_name: None,
            } => write!(f, "step {class_name}"),
        }
    }
}

/// Fixed capability interface for lifecycle observers.
///
/// All hooks default to no-ops so implementations only override what they
/// need. Invocation order is registration order. The engine does not catch
/// listener failures except inside per-worker step execution, where a
/// worker's whole run is already isolated.
pub trait Listener: Send + Sync {
    /// Fired before the subject starts executing.
    fn before(&self, _subject: &Subject<'_>) {}

    /// Fired after the subject finishes without error.
    fn after(&self, _subject: &Subject<'_>) {}

    /// Fired when the subject fails, with the causing error.
    fn error(&self, _subject: &Subject<'_>, _cause: &(dyn std::error::Error + 'static)) {}

    /// Fired once execution ends, on every exit path.
    fn completion(&self, _subject: &Subject<'_>) {}
}

/// Standard status-logging listener, attached first to every step.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

impl Listener for LogListener {
    fn before(&self, subject: &Subject<'_>) {
        info!(subject = %subject, "starting");
    }

    fn after(&self, subject: &Subject<'_>) {
        info!(subject = %subject, "finished");
    }

    fn error(&self, subject: &Subject<'_>, cause: &(dyn std::error::Error + 'static)) {
        warn!(subject = %subject, error = %cause, "failed");
    }

    fn completion(&self, subject: &Subject<'_>) {
        info!(subject = %subject, "completed");
    }
}

/// Constructs a listener instance for one step binding.
pub type ListenerFactory = Arc<dyn Fn() -> Arc<dyn Listener> + Send + Sync>;

/// Name → factory lookup for user-declared listener classes.
pub struct ListenerRegistry {
    factories: HashMap<String, ListenerFactory>,
}

impl ListenerRegistry {
    /// A registry pre-populated with [`LogListener`].
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("LogListener", || Arc::new(LogListener) as Arc<dyn Listener>);
        registry
    }

    /// Registers a factory under a class name, replacing any previous entry.
    pub fn register<F>(&mut self, class_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Listener> + Send + Sync + 'static,
    {
        self.factories.insert(class_name.into(), Arc::new(factory));
    }

    /// Resolves `class_name` to a fresh listener instance, or fails with
    /// [`ScenarioError::UnknownListenerClass`].
    pub fn resolve(&self, class_name: &str) -> Result<Arc<dyn Listener>, ScenarioError> {
        self.factories
            .get(class_name)
            .map(|factory| factory())
            .ok_or_else(|| ScenarioError::UnknownListenerClass(class_name.to_string()))
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
