//! Upstream error classification
//!
//! Normalizes failed source/target calls into a single error shape

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Classification of upstream failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClassification {
    /// 4xx other than auth and rate limiting
    ClientError,
    /// 5xx
    ServerError,
    /// Connect failures and timeouts
    NetworkError,
    /// 429
    RateLimitError,
    /// 401 / 403
    AuthenticationError,
    /// 2xx body that could not be understood
    InvalidResponse,
    Unknown,
}

/// A failed call to a source or target endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamError {
    /// HTTP status code if a response was received
    pub status_code: Option<u16>,
    pub classification: ErrorClassification,
    /// Human-readable message
    pub message: String,
    /// Raw response body, when there was one
    pub body: Option<String>,
    /// Response body parsed as JSON, when possible
    pub details: Option<Value>,
}

impl UpstreamError {
    /// Create from a non-success reqwest Response
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::from_parts(status, body)
    }

    /// Create from a status and the raw body already read
    pub fn from_parts(status: StatusCode, body: String) -> Self {
        let details = serde_json::from_str::<Value>(&body).ok();
        let message = Self::extract_message(&details, &body, status);

        Self {
            status_code: Some(status.as_u16()),
            classification: Self::classify_status(status),
            message,
            body: Some(body),
            details,
        }
    }

    /// Create from a network/request error
    pub fn from_request_error(error: reqwest::Error) -> Self {
        let classification = if error.is_timeout() || error.is_connect() {
            ErrorClassification::NetworkError
        } else {
            ErrorClassification::Unknown
        };

        Self {
            status_code: error.status().map(|s| s.as_u16()),
            classification,
            message: error.to_string(),
            body: None,
            details: None,
        }
    }

    /// Transport-level failure with no response
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            classification: ErrorClassification::NetworkError,
            message: message.into(),
            body: None,
            details: None,
        }
    }

    /// A 2xx answer whose body could not be decoded
    pub fn invalid_response(status: StatusCode, message: impl Into<String>, body: String) -> Self {
        Self {
            status_code: Some(status.as_u16()),
            classification: ErrorClassification::InvalidResponse,
            message: message.into(),
            body: Some(body),
            details: None,
        }
    }

    fn classify_status(status: StatusCode) -> ErrorClassification {
        match status.as_u16() {
            401 | 403 => ErrorClassification::AuthenticationError,
            429 => ErrorClassification::RateLimitError,
            400..=499 => ErrorClassification::ClientError,
            500..=599 => ErrorClassification::ServerError,
            _ => ErrorClassification::Unknown,
        }
    }

    /// Pick a message out of common `{"error": ...}` / `{"message": ...}` shapes
    fn extract_message(details: &Option<Value>, body: &str, status: StatusCode) -> String {
        if let Some(json) = details {
            match json.get("error") {
                Some(Value::String(message)) => return message.clone(),
                Some(error) => {
                    if let Some(message) = error.get("message").and_then(Value::as_str) {
                        return message.to_string();
                    }
                }
                None => {}
            }
            if let Some(message) = json.get("message").and_then(Value::as_str) {
                return message.to_string();
            }
        }

        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("empty response body")
                .to_string()
        } else {
            body.to_string()
        }
    }

    pub fn classification(&self) -> ErrorClassification {
        self.classification
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "HTTP {}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for UpstreamError {}
