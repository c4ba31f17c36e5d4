//! Outbound HTTP for source and target profiles
//!
//! This module provides:
//! - URL placeholder substitution
//! - Auth header construction with secret indirection
//! - Upstream error classification
//! - The [`Upstream`] trait and its reqwest-backed [`HttpConnector`]

pub mod builder;
pub mod auth;
pub mod error;
pub mod timeout;
pub mod client;

pub use auth::{auth_headers, EnvSecretResolver, ResolvedSecret, SecretResolver, StaticSecretResolver};
pub use error::{ErrorClassification, UpstreamError};
pub use timeout::TimeoutConfig;
pub use client::{ConnectorConfig, HttpConnector, Upstream};
