//! Name-keyed lookup of transform functions
//!
//! Copyright (c) 2025 Relaymap Team
//! Licensed under the Apache-2.0 license

use super::built_in;
use super::types::{TransformCall, TransformFunction, TransformOutcome};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Registry of transform functions keyed by upper-case name
#[derive(Debug, Clone)]
pub struct TransformRegistry {
    functions: HashMap<String, TransformFunction>,
}

impl TransformRegistry {
    /// A registry with nothing registered
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// A registry preloaded with the built-in functions
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for (name, function) in built_in::all() {
            registry.register(name, function);
        }
        registry
    }

    /// Shared built-in registry
    pub fn builtin() -> &'static TransformRegistry {
        static BUILTIN: OnceLock<TransformRegistry> = OnceLock::new();
        BUILTIN.get_or_init(Self::with_builtins)
    }

    /// Register (or replace) a function under `name`
    pub fn register(&mut self, name: &str, function: TransformFunction) -> &mut Self {
        self.functions.insert(name.trim().to_uppercase(), function);
        self
    }

    /// Whether a function is registered under `name`, ignoring case
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.trim().to_uppercase())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Apply `expression` to `value`, reporting what happened
    pub fn apply_tagged(&self, value: &Value, expression: &str) -> TransformOutcome {
        let Some(call) = TransformCall::parse(expression) else {
            return TransformOutcome::Unchanged(value.clone());
        };

        let Some(function) = self.functions.get(&call.name) else {
            debug!(transform = %call.name, "Unknown transform, passing value through");
            return TransformOutcome::Unchanged(value.clone());
        };

        match function(value, &call.args) {
            Ok(transformed) => TransformOutcome::Transformed(transformed),
            Err(err) => {
                warn!(transform = %call.name, error = %err, "Transform failed");
                TransformOutcome::Failed {
                    function: call.name,
                    message: err.to_string(),
                }
            }
        }
    }

    /// Apply `expression` to `value`; failures become an `ERROR: ...` string
    pub fn apply(&self, value: &Value, expression: &str) -> Value {
        self.apply_tagged(value, expression).into_value()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
