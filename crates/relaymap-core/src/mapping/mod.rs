//! Mapping engine: path resolution, transforms and versioned rule sets
//!
//! Copyright (c) 2025 Relaymap Team
//! Licensed under the Apache-2.0 license

pub mod path;

pub mod transform;

pub mod ruleset;

pub use ruleset::{Rule, RuleSet};
pub use transform::{TransformOutcome, TransformRegistry};
