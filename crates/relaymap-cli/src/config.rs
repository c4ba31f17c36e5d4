//! Configuration management for the CLI
//!
//! This module handles loading configuration from:
//! - Default values
//! - Configuration files (YAML/JSON/TOML)
//! - Command-line overrides
//!
//! It also loads manifest files, which use the same three formats.

use crate::error::{Error, Result};
use relaymap_core::{ConnectorConfig, Manifest, TimeoutConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Outbound HTTP settings
    pub http: HttpConfig,

    /// Manifest and log locations
    pub paths: PathConfig,

    /// Logging settings
    pub logging: LoggingSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the API listens on
    pub bind: SocketAddr,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connect timeout in seconds
    pub connect_timeout: u64,

    /// Whole-request timeout in seconds
    pub request_timeout: u64,

    /// Verify TLS certificates
    pub validate_tls: bool,

    /// User-Agent override
    pub user_agent: Option<String>,
}

/// Path configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Manifest with adapters and templates
    pub manifest: Option<PathBuf>,

    /// JSON-lines execution log; records stay in memory when unset
    pub execution_log: Option<PathBuf>,
}

/// Logging configuration from the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,

    /// Log format (compact, full, json)
    pub format: Option<String>,

    /// Log file path
    pub file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        let timeouts = TimeoutConfig::default();
        Self {
            connect_timeout: timeouts.connect_timeout.as_secs(),
            request_timeout: timeouts.request_timeout.as_secs(),
            validate_tls: true,
            user_agent: None,
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            manifest: None,
            execution_log: dirs::data_local_dir()
                .map(|dir| dir.join("relaymap").join("executions.jsonl")),
        }
    }
}

/// Serialization format chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
    Toml,
}

impl FileFormat {
    /// Detect from the extension; anything unknown is read as JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("toml") => FileFormat::Toml,
            _ => FileFormat::Json,
        }
    }

    fn name(self) -> &'static str {
        match self {
            FileFormat::Json => "JSON",
            FileFormat::Yaml => "YAML",
            FileFormat::Toml => "TOML",
        }
    }
}

/// Read `path` and deserialize it according to its extension
pub fn read_file<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    let format = FileFormat::from_path(path);

    let invalid = |reason: String| Error::InvalidFormat {
        path: path.to_path_buf(),
        expected: format.name().to_string(),
        reason,
    };

    match format {
        FileFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string())),
        FileFormat::Toml => toml::from_str(&content).map_err(|e| invalid(e.to_string())),
        FileFormat::Json => serde_json::from_str(&content).map_err(|e| invalid(e.to_string())),
    }
}

/// Load a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let value: serde_json::Value = read_file(path)?;
    Ok(Manifest::from_json(value)?)
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        read_file(path)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Using configuration file");
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        match file {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// Get default configuration file paths to check
    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("relaymap.yaml"),
            PathBuf::from("relaymap.yml"),
            PathBuf::from("relaymap.json"),
            PathBuf::from("relaymap.toml"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            let relaymap_dir = config_dir.join("relaymap");
            paths.push(relaymap_dir.join("config.yaml"));
            paths.push(relaymap_dir.join("config.json"));
            paths.push(relaymap_dir.join("config.toml"));
        }

        paths
    }

    /// Outbound connector settings
    pub fn connector_config(&self) -> Result<ConnectorConfig> {
        let timeouts = TimeoutConfig::from_secs(self.http.connect_timeout, self.http.request_timeout);
        timeouts.validate().map_err(Error::config)?;

        let mut config = ConnectorConfig {
            timeouts,
            validate_tls: self.http.validate_tls,
            ..ConnectorConfig::default()
        };
        if let Some(agent) = &self.http.user_agent {
            config.user_agent = agent.clone();
        }
        Ok(config)
    }

    /// Manifest path, preferring an explicit override
    pub fn manifest_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.paths.manifest.clone())
            .ok_or_else(|| {
                Error::config("No manifest given; pass --manifest or set paths.manifest")
            })
    }

    /// Execution log path, preferring an explicit override
    pub fn execution_log_path(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.paths.execution_log.clone())
    }
}
