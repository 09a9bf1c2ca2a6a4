//! Class-name resolution via an explicit factory registry.
//!
//! Step classes are declared by name in scenario documents. Resolution walks
//! a priority-ordered list of namespaces: project-scoped first, then
//! shared/common, then the built-in catalog. The first exact match wins and
//! the search stops there; namespaces never merge entries under one name.

use crate::error::ScenarioError;
use crate::step::{Step, StepArgs, builtin};
use std::collections::HashMap;
use std::sync::Arc;

/// Constructs a step from its interpolated arguments.
pub type StepFactory =
    Arc<dyn Fn(StepArgs) -> Result<Arc<dyn Step>, ScenarioError> + Send + Sync>;

/// A named group of step factories searched as one resolution scope.
#[derive(Clone)]
pub struct StepNamespace {
    name: String,
    factories: HashMap<String, StepFactory>,
}

impl StepNamespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factories: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a factory under a class name, replacing any previous entry
    /// with the same name in this namespace.
    pub fn register<F>(&mut self, class_name: impl Into<String>, factory: F)
    where
        F: Fn(StepArgs) -> Result<Arc<dyn Step>, ScenarioError> + Send + Sync + 'static,
    {
        self.factories.insert(class_name.into(), Arc::new(factory));
    }

    fn get(&self, class_name: &str) -> Option<StepFactory> {
        self.factories.get(class_name).cloned()
    }
}

/// Priority-ordered step resolver.
///
/// `resolve` searches project namespaces, then shared namespaces, then the
/// built-in catalog, in registration order within each tier.
pub struct StepRegistry {
    project: Vec<StepNamespace>,
    shared: Vec<StepNamespace>,
    builtin: StepNamespace,
}

impl StepRegistry {
    /// A registry holding only the built-in catalog.
    pub fn new() -> Self {
        Self {
            project: Vec::new(),
            shared: Vec::new(),
            builtin: builtin::catalog(),
        }
    }

    /// Adds a project-scoped namespace, searched before everything else.
    pub fn add_project_namespace(&mut self, namespace: StepNamespace) {
        self.project.push(namespace);
    }

    /// Adds a shared namespace, searched after project scopes and before the
    /// built-in catalog.
    pub fn add_shared_namespace(&mut self, namespace: StepNamespace) {
        self.shared.push(namespace);
    }

    /// Resolves `class_name` to a factory, or fails with
    /// [`ScenarioError::UnknownStepClass`] carrying the attempted name.
    pub fn resolve(&self, class_name: &str) -> Result<StepFactory, ScenarioError> {
        self.project
            .iter()
            .chain(self.shared.iter())
            .chain(std::iter::once(&self.builtin))
            .find_map(|namespace| namespace.get(class_name))
            .ok_or_else(|| ScenarioError::UnknownStepClass(class_name.to_string()))
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}
