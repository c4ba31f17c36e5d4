//! Execution request body and response shape

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message used for any body that is not a JSON object
pub const MALFORMED_PAYLOAD: &str = "Malformed JSON payload";

/// A parsed execution request body
///
/// Recognised keys are `data`, `params` and `is_test`; the whole object is
/// kept as well for webhook-style delivery to passive sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteRequest {
    /// Explicit input, when `data` is present and not null
    pub data: Option<Value>,
    /// URL placeholder values for active sources
    pub params: Map<String, Value>,
    pub is_test: bool,
    /// The complete body as received
    pub body: Map<String, Value>,
}

impl ExecuteRequest {
    /// Interpret a JSON body
    pub fn from_body(body: Value) -> Result<Self> {
        let Value::Object(body) = body else {
            return Err(Error::validation(MALFORMED_PAYLOAD));
        };

        let data = body.get("data").filter(|data| !data.is_null()).cloned();

        let params = match body.get("params") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(params)) => params.clone(),
            Some(_) => return Err(Error::validation("`params` must be an object")),
        };

        let is_test = match body.get("is_test") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => return Err(Error::validation("`is_test` must be a boolean")),
        };

        Ok(Self {
            data,
            params,
            is_test,
            body,
        })
    }

    /// Interpret raw bytes; an empty body counts as `{}`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let body: Value =
            serde_json::from_slice(bytes).map_err(|_| Error::validation(MALFORMED_PAYLOAD))?;
        Self::from_body(body)
    }
}

/// What a successful execution returns to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub mapped_data: Map<String, Value>,
    /// Target reply; `null` for passive targets
    pub target_response: Option<Value>,
}
