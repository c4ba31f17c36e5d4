//! Core types for the transform system
//!
//! Copyright (c) 2025 Relaymap Team
//! Licensed under the Apache-2.0 license

use serde_json::Value;
use thiserror::Error;

/// Failure raised inside a transform function
///
/// Never propagated out of the registry: it is rendered into the output value
/// as `ERROR: <message>`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// The function could not make sense of its input
    #[error("{message}")]
    InvalidInput {
        message: String,
    },

    /// The function could not make sense of an argument
    #[error("invalid argument `{argument}` for {function}: {message}")]
    InvalidArgument {
        function: String,
        argument: String,
        message: String,
    },

    /// Anything else going wrong inside a custom transform
    #[error("{0}")]
    Failed(String),
}

/// A transform: takes the resolved value and the call arguments
pub type TransformFunction = fn(&Value, &[String]) -> Result<Value, TransformError>;

/// Parsed form of a transform expression such as `ROUND(2)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformCall {
    /// Upper-cased function name
    pub name: String,
    /// Trimmed arguments, in call order
    pub args: Vec<String>,
}

impl TransformCall {
    /// Parse `NAME` or `NAME(arg1, arg2, ...)`
    ///
    /// Returns `None` for an empty expression. Arguments are only recognised
    /// when the expression contains `(` and ends with `)`; they are split on
    /// `,` without any quoting support.
    pub fn parse(expression: &str) -> Option<Self> {
        if expression.trim().is_empty() {
            return None;
        }

        let (head, tail) = match expression.find('(') {
            Some(open) => (&expression[..open], Some(&expression[open + 1..])),
            None => (expression, None),
        };
        let name = head.trim().to_uppercase();

        let args = match tail.and_then(|rest| rest.strip_suffix(')')) {
            Some("") | None => Vec::new(),
            Some(inner) => inner.split(',').map(|arg| arg.trim().to_string()).collect(),
        };

        Some(Self { name, args })
    }

    /// Argument at `index`, if given
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

/// What happened when a transform expression was applied
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    /// Empty expression or unknown function name
    Unchanged(Value),
    /// The function ran and produced a value
    Transformed(Value),
    /// The function raised; the value is replaced by an error string
    Failed {
        function: String,
        message: String,
    },
}

impl TransformOutcome {
    /// Prefix of the sentinel string embedded for failed transforms
    pub const ERROR_PREFIX: &'static str = "ERROR: ";

    /// Collapse into the value that is written to the output map
    pub fn into_value(self) -> Value {
        match self {
            TransformOutcome::Unchanged(value) | TransformOutcome::Transformed(value) => value,
            TransformOutcome::Failed { message, .. } => {
                Value::String(format!("{}{}", Self::ERROR_PREFIX, message))
            }
        }
    }

    /// Whether the transform raised
    pub fn is_failed(&self) -> bool {
        matches!(self, TransformOutcome::Failed { .. })
    }
}

/// Python-style truthiness used by value-sensitive transforms
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Render a value as text: strings raw, everything else as compact JSON
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
