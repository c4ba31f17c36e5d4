//! Named value transforms applied by mapping rules
//!
//! A rule carries an optional expression of the form `NAME` or
//! `NAME(arg1, arg2)`. The name is matched case-insensitively against a
//! [`TransformRegistry`]; unknown names and empty expressions leave the value
//! untouched. A transform that raises never aborts the mapping: its output
//! becomes the string `ERROR: <message>`.
//!
//! ```
//! use relaymap_core::mapping::transform::TransformRegistry;
//! use serde_json::json;
//!
//! let registry = TransformRegistry::builtin();
//! assert_eq!(registry.apply(&json!("  John "), "trim"), json!("John"));
//! assert_eq!(registry.apply(&json!(3.14159), "ROUND(2)"), json!(3.14));
//! assert_eq!(registry.apply(&json!(null), "DEFAULT(n/a)"), json!("n/a"));
//! ```
//!
//! Copyright (c) 2025 Relaymap Team
//! Licensed under the Apache-2.0 license

pub mod types;

pub mod registry;

pub mod built_in;


pub use registry::TransformRegistry;
pub use types::{
    is_truthy, value_to_text, TransformCall, TransformError, TransformFunction, TransformOutcome,
};
