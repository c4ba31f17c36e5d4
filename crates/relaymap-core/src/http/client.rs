//! Outbound connector for source and target profiles
//!
//! `fetch` pulls JSON from a source profile, `send` posts mapped data to a
//! target profile. Both attach the profile's auth headers. There are no
//! retries: one attempt per call, bounded by [`TimeoutConfig`].

use crate::http::auth::{auth_headers, EnvSecretResolver, SecretResolver};
use crate::http::builder::{build_url, parse_url};
use crate::http::{TimeoutConfig, UpstreamError};
use crate::types::Profile;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// The pipeline's view of the outside world
#[async_trait]
pub trait Upstream: Send + Sync {
    /// GET the source profile's URL with `params` substituted; returns the JSON body
    async fn fetch(&self, profile: &Profile, params: &Map<String, Value>) -> Result<Value>;

    /// POST `data` to the target profile; `None` when the profile is passive
    async fn send(&self, profile: &Profile, data: &Value) -> Result<Option<Value>>;
}

/// Configuration for the HTTP connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub timeouts: TimeoutConfig,
    /// Whether to validate TLS certificates
    pub validate_tls: bool,
    pub user_agent: String,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            validate_tls: true,
            user_agent: format!("relaymap/{}", crate::VERSION),
        }
    }
}

/// reqwest-backed [`Upstream`]
#[derive(Clone)]
pub struct HttpConnector {
    client: ReqwestClient,
    resolver: Arc<dyn SecretResolver>,
    config: ConnectorConfig,
}

impl std::fmt::Debug for HttpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnector").field("config", &self.config).finish()
    }
}

impl HttpConnector {
    /// Create a connector resolving secrets through `resolver`
    pub fn new(config: ConnectorConfig, resolver: Arc<dyn SecretResolver>) -> Result<Self> {
        config.timeouts.validate().map_err(Error::configuration)?;

        let client = ReqwestClient::builder()
            .connect_timeout(config.timeouts.connect_timeout)
            .timeout(config.timeouts.request_timeout)
            .danger_accept_invalid_certs(!config.validate_tls)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(anyhow::Error::new(e)),
            })?;

        Ok(Self {
            client,
            resolver,
            config,
        })
    }

    /// Default configuration, secrets from the process environment
    pub fn with_default_config() -> Result<Self> {
        Self::new(ConnectorConfig::default(), Arc::new(EnvSecretResolver))
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }
}

/// Wrap a 2xx send body: JSON as-is, anything else as `{status, text}`
fn send_reply(status: StatusCode, body: String) -> Value {
    serde_json::from_str(&body).unwrap_or_else(|_| {
        json!({
            "status": status.as_u16(),
            "text": body,
        })
    })
}

#[async_trait]
impl Upstream for HttpConnector {
    async fn fetch(&self, profile: &Profile, params: &Map<String, Value>) -> Result<Value> {
        let template = profile
            .base_url()
            .ok_or_else(|| Error::validation("Source profile has no API URL configured"))?;

        let url = build_url(template, params)?;
        let headers = auth_headers(&profile.auth, self.resolver.as_ref())?;

        debug!(profile = %profile.name, url = %url, "Fetching source data");

        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| Error::UpstreamFetch(UpstreamError::from_request_error(e)))?;

        let status = response.status();
        if !status.is_success() {
            let error = UpstreamError::from_response(response).await;
            warn!(profile = %profile.name, status = status.as_u16(), "Source returned an error");
            return Err(Error::UpstreamFetch(error));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::UpstreamFetch(UpstreamError::from_request_error(e)))?;

        serde_json::from_str(&body).map_err(|e| {
            Error::UpstreamFetch(UpstreamError::invalid_response(
                status,
                format!("Source response is not valid JSON: {}", e),
                body,
            ))
        })
    }

    async fn send(&self, profile: &Profile, data: &Value) -> Result<Option<Value>> {
        let Some(raw_url) = profile.base_url() else {
            debug!(profile = %profile.name, "Target is passive, nothing to send");
            return Ok(None);
        };

        let url = parse_url(raw_url)?;
        let headers = auth_headers(&profile.auth, self.resolver.as_ref())?;

        debug!(profile = %profile.name, url = %url, "Sending mapped data");

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(data)
            .send()
            .await
            .map_err(|e| Error::UpstreamSend(UpstreamError::from_request_error(e)))?;

        let status = response.status();
        if !status.is_success() {
            let error = UpstreamError::from_response(response).await;
            warn!(profile = %profile.name, status = status.as_u16(), "Target returned an error");
            return Err(Error::UpstreamSend(error));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::UpstreamSend(UpstreamError::from_request_error(e)))?;

        Ok(Some(send_reply(status, body)))
    }
}
