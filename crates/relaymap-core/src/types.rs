//! Core data types for Relaymap
//!
//! Profiles and templates are owned by the configuration store, execution
//! records by the log store. Rule sets live in [`crate::mapping::ruleset`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Role of an integration profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProfileRole {
    /// Produces data for a template
    #[default]
    Source,
    /// Receives mapped data
    Target,
}

impl fmt::Display for ProfileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileRole::Source => write!(f, "SOURCE"),
            ProfileRole::Target => write!(f, "TARGET"),
        }
    }
}

/// A named endpoint definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub role: ProfileRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default)]
    pub auth: AuthDescriptor,
    /// Free-form description of the fields this endpoint speaks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl Profile {
    /// Configured URL, treating an empty string as unset
    pub fn base_url(&self) -> Option<&str> {
        self.api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// A passive profile never dials out
    pub fn is_passive(&self) -> bool {
        self.base_url().is_none()
    }
}

/// Reference to a secret: either the literal value or an `env:NAME` indirection
///
/// Serialized back in its unresolved form so a resolved secret never ends up
/// in a store or a log.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SecretRef {
    Literal(String),
    Env(String),
}

impl SecretRef {
    pub const ENV_PREFIX: &'static str = "env:";

    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(Self::ENV_PREFIX) {
            Some(name) => SecretRef::Env(name.to_string()),
            None => SecretRef::Literal(raw.to_string()),
        }
    }
}

impl From<String> for SecretRef {
    fn from(raw: String) -> Self {
        SecretRef::parse(&raw)
    }
}

impl From<SecretRef> for String {
    fn from(secret: SecretRef) -> Self {
        match secret {
            SecretRef::Literal(value) => value,
            SecretRef::Env(name) => format!("{}{}", SecretRef::ENV_PREFIX, name),
        }
    }
}

impl fmt::Debug for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretRef::Literal(_) => write!(f, "SecretRef::Literal(***)"),
            SecretRef::Env(name) => write!(f, "SecretRef::Env({})", name),
        }
    }
}

/// Default header used by `ApiKey` auth when no `key_name` is configured
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// How a profile authenticates against its endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawAuth", into = "RawAuth")]
pub enum AuthDescriptor {
    #[default]
    None,
    Bearer {
        token: SecretRef,
    },
    /// Accepted in configuration, but produces no header
    Basic,
    ApiKey {
        key_name: String,
        value: SecretRef,
    },
}

/// Wire shape: `{ "type": ..., "token"|"value": ..., "key_name"?: ... }`
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawAuth {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<SecretRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<SecretRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_name: Option<String>,
}

impl TryFrom<RawAuth> for AuthDescriptor {
    type Error = String;

    fn try_from(raw: RawAuth) -> std::result::Result<Self, Self::Error> {
        match raw.kind.as_deref() {
            None | Some("") | Some("None") => Ok(AuthDescriptor::None),
            Some("Bearer") => raw
                .token
                .map(|token| AuthDescriptor::Bearer { token })
                .ok_or_else(|| "Bearer auth requires a `token`".to_string()),
            Some("Basic") => Ok(AuthDescriptor::Basic),
            Some("ApiKey") => raw
                .value
                .map(|value| AuthDescriptor::ApiKey {
                    key_name: raw
                        .key_name
                        .filter(|name| !name.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string()),
                    value,
                })
                .ok_or_else(|| "ApiKey auth requires a `value`".to_string()),
            Some(other) => Err(format!("unsupported auth type `{}`", other)),
        }
    }
}

impl From<AuthDescriptor> for RawAuth {
    fn from(auth: AuthDescriptor) -> Self {
        match auth {
            AuthDescriptor::None => RawAuth::default(),
            AuthDescriptor::Bearer { token } => RawAuth {
                kind: Some("Bearer".to_string()),
                token: Some(token),
                ..RawAuth::default()
            },
            AuthDescriptor::Basic => RawAuth {
                kind: Some("Basic".to_string()),
                ..RawAuth::default()
            },
            AuthDescriptor::ApiKey { key_name, value } => RawAuth {
                kind: Some("ApiKey".to_string()),
                value: Some(value),
                key_name: Some(key_name),
                ..RawAuth::default()
            },
        }
    }
}

/// A reusable pairing of a source and a target profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub active_version: Option<String>,
}

/// Terminal status of one execution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Success,
    Error,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Success => write!(f, "SUCCESS"),
            ExecutionStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Immutable audit entry written once per execution attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub status: ExecutionStatus,
    pub timestamp: DateTime<Utc>,
    pub template_id: Option<String>,
    pub template_name: Option<String>,
    pub version_id: Option<String>,
    pub version_number: Option<u32>,
    pub input_data: Option<Value>,
    pub output_data: Option<Value>,
    pub error_message: Option<String>,
    pub is_test: bool,
}

/// Everything the pipeline knows when it is ready to log
///
/// The log store stamps `id` and `timestamp` when it accepts the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExecutionRecord {
    pub status: ExecutionStatus,
    pub template_id: Option<String>,
    pub template_name: Option<String>,
    pub version_id: Option<String>,
    pub version_number: Option<u32>,
    pub input_data: Option<Value>,
    pub output_data: Option<Value>,
    pub error_message: Option<String>,
    pub is_test: bool,
}

impl NewExecutionRecord {
    /// Stamp the entry into a stored record
    pub fn into_record(self, id: String, timestamp: DateTime<Utc>) -> ExecutionRecord {
        ExecutionRecord {
            id,
            status: self.status,
            timestamp,
            template_id: self.template_id,
            template_name: self.template_name,
            version_id: self.version_id,
            version_number: self.version_number,
            input_data: self.input_data,
            output_data: self.output_data,
            error_message: self.error_message,
            is_test: self.is_test,
        }
    }
}
