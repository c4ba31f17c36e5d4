//! Authentication headers for source and target profiles
//!
//! Supports:
//! - Bearer tokens (`Authorization: Bearer ...`)
//! - API keys in a configurable header (default `X-API-Key`)
//! - `env:NAME` secret indirection, resolved at call time
//!
//! `Basic` is accepted in configuration but contributes no header.

use crate::types::{AuthDescriptor, SecretRef};
use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use std::collections::HashMap;
use std::fmt;

/// A secret after resolution; `Debug` never prints the value
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedSecret(String);

impl ResolvedSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ResolvedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolvedSecret(***)")
    }
}

/// Turns a [`SecretRef`] into the value sent on the wire
pub trait SecretResolver: Send + Sync {
    fn resolve(&self, secret: &SecretRef) -> ResolvedSecret;
}

/// Resolves `env:NAME` from the process environment; unset variables become ""
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretResolver;

impl SecretResolver for EnvSecretResolver {
    fn resolve(&self, secret: &SecretRef) -> ResolvedSecret {
        match secret {
            SecretRef::Literal(value) => ResolvedSecret::new(value.clone()),
            SecretRef::Env(name) => ResolvedSecret::new(std::env::var(name).unwrap_or_default()),
        }
    }
}

/// Resolves `env:NAME` from a fixed map, for tests and embedding
#[derive(Clone, Default)]
pub struct StaticSecretResolver {
    values: HashMap<String, String>,
}

impl StaticSecretResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl fmt::Debug for StaticSecretResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_struct("StaticSecretResolver").field("names", &names).finish()
    }
}

impl SecretResolver for StaticSecretResolver {
    fn resolve(&self, secret: &SecretRef) -> ResolvedSecret {
        match secret {
            SecretRef::Literal(value) => ResolvedSecret::new(value.clone()),
            SecretRef::Env(name) => {
                ResolvedSecret::new(self.values.get(name).cloned().unwrap_or_default())
            }
        }
    }
}

fn sensitive_value(raw: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(raw)
        .map_err(|_| Error::configuration("Auth secret contains characters not allowed in a header"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Build the headers `auth` contributes to a request
pub fn auth_headers(auth: &AuthDescriptor, resolver: &dyn SecretResolver) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    match auth {
        AuthDescriptor::None | AuthDescriptor::Basic => {}
        AuthDescriptor::Bearer { token } => {
            let token = resolver.resolve(token);
            headers.insert(AUTHORIZATION, sensitive_value(&format!("Bearer {}", token.expose()))?);
        }
        AuthDescriptor::ApiKey { key_name, value } => {
            let name = HeaderName::from_bytes(key_name.as_bytes()).map_err(|e| Error::Configuration {
                message: format!("Invalid API key header name: {}", key_name),
                source: Some(anyhow::Error::new(e)),
            })?;
            let value = resolver.resolve(value);
            headers.insert(name, sensitive_value(value.expose())?);
        }
    }

    Ok(headers)
}
