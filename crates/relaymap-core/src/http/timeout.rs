//! Timeout configuration for outbound calls

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts applied to every fetch and send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Time allowed to establish a connection
    pub connect_timeout: Duration,
    /// Total time for the whole request, body included
    pub request_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl TimeoutConfig {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            request_timeout,
        }
    }

    /// Build from whole seconds, as written in config files
    pub fn from_secs(connect_secs: u64, request_secs: u64) -> Self {
        Self::new(Duration::from_secs(connect_secs), Duration::from_secs(request_secs))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.connect_timeout.is_zero() {
            return Err("Connect timeout cannot be zero".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("Request timeout cannot be zero".to_string());
        }

        if self.request_timeout < self.connect_timeout {
            return Err("Request timeout should be >= connect timeout".to_string());
        }

        Ok(())
    }
}
