//! Versioned rule sets and the mapping loop
//!
//! Copyright (c) 2025 Relaymap Team
//! Licensed under the Apache-2.0 license

use super::path;
use super::transform::TransformRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One field mapping: read `source_path`, run `transform`, write `target_field`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub source_path: String,
    pub target_field: String,
    #[serde(default)]
    pub transform: String,
}

impl Rule {
    pub fn new(source_path: impl Into<String>, target_field: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            target_field: target_field.into(),
            transform: String::new(),
        }
    }

    pub fn with_transform(mut self, transform: impl Into<String>) -> Self {
        self.transform = transform.into();
        self
    }
}

/// A frozen, numbered list of rules belonging to one template
///
/// Instances are handed out behind `Arc` by the configuration store and have
/// no mutating API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub id: String,
    pub template_id: String,
    pub version_number: u32,
    pub rules: Vec<Rule>,
    pub created_at: DateTime<Utc>,
}

impl RuleSet {
    /// Map `input` into a flat object
    ///
    /// Rules run in stored order. An absent source path feeds `null` into the
    /// transform, and a later rule writing the same `target_field` replaces
    /// the earlier value.
    pub fn execute(&self, input: &Value, registry: &TransformRegistry) -> Map<String, Value> {
        let mut output = Map::new();
        for rule in &self.rules {
            let value = path::resolve_or_null(input, &rule.source_path);
            output.insert(rule.target_field.clone(), registry.apply(&value, &rule.transform));
        }
        output
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
