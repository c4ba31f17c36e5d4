//! Logging utilities for the Relaymap CLI
//!
//! This module provides:
//! - Structured logging setup (console or file, compact/full/json)
//! - Request ID generation
//! - Sensitive data redaction
//! - Performance timing spans

use crate::config::LoggingSettings;
use crate::error::{Error, Result};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{field, Span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: String,
    /// Output format: compact, full, json
    pub format: LogFormat,
    /// Enable console output
    pub console: bool,
    /// Optional file output path
    pub file: Option<PathBuf>,
    /// Include thread IDs
    pub thread_ids: bool,
    /// Include file and line numbers
    pub source_location: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact format for production
    Compact,
    /// Full format with all details
    Full,
    /// JSON structured format
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "compact" => Some(LogFormat::Compact),
            "full" => Some(LogFormat::Full),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            console: true,
            file: None,
            thread_ids: false,
            source_location: false,
        }
    }
}

impl LoggingConfig {
    /// Create logging config from verbosity level
    pub fn from_verbosity(verbosity: u8) -> Self {
        let mut config = Self::default();

        match verbosity {
            0 => {
                config.level = "warn".to_string();
            }
            1 => {
                config.level = "info".to_string();
            }
            2 => {
                config.level = "debug".to_string();
                config.source_location = true;
            }
            _ => {
                config.level = "trace".to_string();
                config.format = LogFormat::Full;
                config.source_location = true;
                config.thread_ids = true;
            }
        }

        config
    }

    /// Apply the `logging` section of the config file
    pub fn merge_with_settings(&mut self, settings: &LoggingSettings) {
        if let Some(level) = &settings.level {
            self.level = level.clone();
        }
        if let Some(format) = settings.format.as_deref().and_then(LogFormat::parse) {
            self.format = format;
        }
        if let Some(file) = &settings.file {
            self.file = Some(file.clone());
        }
    }

    /// Apply environment overrides
    pub fn merge_with_env(&mut self) {
        // RUST_LOG takes precedence
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            self.level = rust_log;
        }

        if let Ok(format) = std::env::var("RELAYMAP_LOG_FORMAT") {
            match LogFormat::parse(&format) {
                Some(format) => self.format = format,
                None => eprintln!("Invalid log format: {}, using default", format),
            }
        }

        if let Ok(file) = std::env::var("RELAYMAP_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }

        if let Ok(console) = std::env::var("RELAYMAP_LOG_CONSOLE") {
            self.console = console.to_lowercase() == "true" || console == "1";
        }
    }
}

/// Initialize the global logging system
///
/// The returned guard flushes file output when dropped; keep it alive for
/// the lifetime of the process.
pub fn init_logging(config: LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = create_env_filter(&config)?;

    let (writer, guard, ansi) = match &config.file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            (BoxMakeWriter::new(writer), Some(guard), false)
        }
        None => {
            let ansi = config.console && std::io::stderr().is_terminal();
            (BoxMakeWriter::new(std::io::stderr), None, ansi)
        }
    };

    // Each format has its own subscriber type
    let installed = match config.format {
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .with_target(true)
                .with_ansi(ansi)
                .with_thread_ids(config.thread_ids)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .compact()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_thread_ids(config.thread_ids)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Full => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .with_target(true)
                .with_ansi(ansi)
                .with_thread_ids(config.thread_ids)
                .with_file(config.source_location)
                .with_line_number(config.source_location)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };
    installed.map_err(|e| Error::other(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(
        level = %config.level,
        format = ?config.format,
        file = ?config.file,
        "Logging system initialized"
    );

    Ok(guard)
}

fn file_writer(
    path: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::config(format!("Invalid log file path: {}", path.display())))?;

    std::fs::create_dir_all(directory)?;
    let appender = tracing_appender::rolling::never(directory, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

/// Create environment filter based on configuration
fn create_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_new(&config.level)
        .map_err(|e| Error::config(format!("Invalid log filter '{}': {}", config.level, e)))
}

/// Generate a unique request ID
pub fn generate_request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

/// Create a span for a timed operation
pub fn create_operation_span(operation: &str, details: Option<&str>) -> Span {
    tracing::info_span!(
        "operation",
        operation = operation,
        details = details.unwrap_or(""),
        duration_ms = field::Empty,
    )
}

/// Masking of credentials before bodies and manifests reach a log line
///
/// Adapter `auth` blocks keep their `env:` references visible and hide
/// literal secrets. Free text loses `Bearer` tokens and credential
/// query pairs such as `?token=...`.
pub mod redaction {
    use regex::Regex;
    use serde_json::{Map, Value};
    use std::sync::OnceLock;

    const MASK: &str = "***";

    /// Fields of an `auth` block that may hold a secret
    const AUTH_SECRET_FIELDS: [&str; 2] = ["token", "value"];

    static BEARER: OnceLock<Regex> = OnceLock::new();
    static CREDENTIAL_PAIR: OnceLock<Regex> = OnceLock::new();

    fn bearer() -> &'static Regex {
        BEARER.get_or_init(|| {
            Regex::new(r"(?i)\b(bearer)\s+[A-Za-z0-9._~+/=-]{6,}").expect("Valid regex pattern")
        })
    }

    fn credential_pair() -> &'static Regex {
        CREDENTIAL_PAIR.get_or_init(|| {
            Regex::new(r"(?i)\b(token|access_token|api[_-]?key|secret|password)=[^&\s]+")
                .expect("Valid regex pattern")
        })
    }

    /// Mask bearer tokens and credential pairs in free text
    pub fn redact_sensitive(input: &str) -> String {
        let result = bearer().replace_all(input, "$1 ***");
        credential_pair().replace_all(&result, "$1=***").into_owned()
    }

    /// Redact `value` in place
    pub fn redact_json_value(value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    if key == "auth" {
                        if let Value::Object(auth) = val {
                            redact_auth(auth);
                            continue;
                        }
                    }
                    if is_sensitive_key(key) {
                        *val = Value::String(MASK.to_string());
                    } else {
                        redact_json_value(val);
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(redact_json_value),
            Value::String(text) => *text = redact_sensitive(text),
            _ => {}
        }
    }

    /// Redacted copy of `value`, for log fields
    pub fn redacted(value: &Value) -> Value {
        let mut copy = value.clone();
        redact_json_value(&mut copy);
        copy
    }

    fn redact_auth(auth: &mut Map<String, Value>) {
        for field in AUTH_SECRET_FIELDS {
            if let Some(secret) = auth.get_mut(field) {
                let is_reference = secret.as_str().is_some_and(|s| s.starts_with("env:"));
                if !is_reference {
                    *secret = Value::String(MASK.to_string());
                }
            }
        }
    }

    /// Keys whose values are credentials wherever they appear
    fn is_sensitive_key(key: &str) -> bool {
        matches!(
            key.to_ascii_lowercase().replace('-', "_").as_str(),
            "authorization" | "token" | "access_token" | "api_key" | "apikey" | "secret" | "password"
        )
    }
}

/// Performance timing utilities
pub mod timing {
    use std::time::Instant;
    use tracing::Span;

    /// A timer that logs its duration when dropped
    pub struct Timer {
        start: Instant,
        span: Span,
        operation: String,
    }

    impl Timer {
        pub fn new(operation: &str) -> Self {
            Self::build(operation, None)
        }

        pub fn with_details(operation: &str, details: &str) -> Self {
            Self::build(operation, Some(details))
        }

        fn build(operation: &str, details: Option<&str>) -> Self {
            Self {
                start: Instant::now(),
                span: super::create_operation_span(operation, details),
                operation: operation.to_string(),
            }
        }

        /// Get elapsed time without finishing the timer
        pub fn elapsed(&self) -> std::time::Duration {
            self.start.elapsed()
        }
    }

    impl Drop for Timer {
        fn drop(&mut self) {
            let duration = self.start.elapsed();
            self.span.record("duration_ms", duration.as_millis() as u64);

            tracing::debug!(
                operation = %self.operation,
                duration_ms = duration.as_millis() as u64,
                "Operation completed"
            );
        }
    }
}
