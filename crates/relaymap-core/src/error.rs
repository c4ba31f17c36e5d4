//! Error types for the Relaymap core library
//!
//! Pipeline-level failures are modelled here with thiserror; transform
//! failures are deliberately *not* part of this type (see
//! [`crate::mapping::transform`]), they are embedded into output values instead.

use std::fmt;
use thiserror::Error;
use serde::{Deserialize, Serialize};

use crate::http::UpstreamError;

/// Main error type for Relaymap operations
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-side problems: missing input, no active version, malformed body
    #[error("{message}")]
    Validation {
        message: String,
    },

    /// A `{name}` placeholder in a URL template had no matching parameter
    #[error("Missing required URL parameter: {name}")]
    MissingParameter {
        name: String,
    },

    /// The requested template does not exist in the configuration store
    #[error("Template not found: {id}")]
    TemplateNotFound {
        id: String,
    },

    /// Any other configuration entity lookup that came back empty
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// Fetching from the source endpoint failed
    #[error("Fetch error: {0}")]
    UpstreamFetch(#[source] UpstreamError),

    /// Sending to the target endpoint failed
    #[error("Send error: {0}")]
    UpstreamSend(#[source] UpstreamError),

    /// Configuration errors (profiles, auth descriptors, client setup)
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Configuration or log store failures
    #[error("Store error: {message}")]
    Store {
        message: String,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used to pick a response status and log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// The caller sent something we cannot act on
    Validation,
    /// The addressed entity does not exist
    NotFound,
    /// A source or target endpoint misbehaved
    Upstream,
    /// Everything else
    Internal,
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error without a source
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Validation { .. } | Error::MissingParameter { .. } => ErrorClass::Validation,
            Error::TemplateNotFound { .. } | Error::NotFound { .. } => ErrorClass::NotFound,
            Error::UpstreamFetch(_) | Error::UpstreamSend(_) => ErrorClass::Upstream,
            Error::Configuration { .. }
            | Error::Store { .. }
            | Error::Json { .. }
            | Error::Io { .. }
            | Error::Internal { .. } => ErrorClass::Internal,
        }
    }

    /// Whether the caller is at fault (HTTP 4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(self.class(), ErrorClass::Validation | ErrorClass::NotFound)
    }

    /// HTTP status code the server surface should answer with
    pub fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::Validation => 400,
            ErrorClass::NotFound => 404,
            ErrorClass::Upstream | ErrorClass::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Validation => write!(f, "validation"),
            ErrorClass::NotFound => write!(f, "not_found"),
            ErrorClass::Upstream => write!(f, "upstream"),
            ErrorClass::Internal => write!(f, "internal"),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}
