//! Shared producer/consumer table for cross-step value exchange.

use serde_yaml::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Lookup table connecting producing steps to consuming steps.
///
/// The parser records each symbolic-named step's bound-argument snapshot
/// here, and steps may publish artifacts of their own during execution.
/// Writes follow a last-writer-wins contract: a later `publish` for the same
/// key silently shadows the earlier value.
///
/// The handle is cheap to clone and all clones share one table. The driver
/// owns the canonical handle; every step receives a clone at construction.
#[derive(Debug, Clone, Default)]
pub struct ScenarioContext {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any earlier value for that key.
    pub fn publish(&self, key: impl Into<String>, value: Value) {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.into(), value);
    }

    /// Returns a clone of the value published under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
