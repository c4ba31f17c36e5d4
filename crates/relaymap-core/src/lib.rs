//! Relaymap Core - mapping execution engine
//!
//! This crate maps JSON records from a source endpoint onto the flat field
//! layout a target endpoint expects, driven by versioned rule sets.
//!
//! # Main Components
//!
//! - **Mapping**: dotted path resolution, named transforms and rule sets
//! - **HTTP**: fetching from sources and sending to targets, with auth headers
//! - **Stores**: configuration snapshots and the append-only execution log
//! - **Pipeline**: the orchestrator tying fetch, map, send and log together
//!
//! # Example
//!
//! ```
//! use relaymap_core::mapping::{Rule, RuleSet, TransformRegistry};
//! use serde_json::json;
//!
//! let ruleset = RuleSet {
//!     id: "v1".to_string(),
//!     template_id: "erp-to-crm".to_string(),
//!     version_number: 1,
//!     rules: vec![
//!         Rule::new("company.tax_id", "document").with_transform("REMOVE_PUNCTUATION"),
//!         Rule::new("company.name", "name").with_transform("UPPERCASE"),
//!     ],
//!     created_at: chrono::Utc::now(),
//! };
//!
//! let input = json!({"company": {"tax_id": "12.345.678/0001-90", "name": "Acme"}});
//! let output = ruleset.execute(&input, TransformRegistry::builtin());
//! assert_eq!(output["document"], json!("12345678000190"));
//! assert_eq!(output["name"], json!("ACME"));
//! ```

pub mod error;
pub mod http;
pub mod mapping;
pub mod pipeline;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use error::{Error, ErrorClass, Result};
pub use http::{
    ConnectorConfig, EnvSecretResolver, HttpConnector, SecretResolver, StaticSecretResolver,
    TimeoutConfig, Upstream, UpstreamError,
};
pub use mapping::{Rule, RuleSet, TransformOutcome, TransformRegistry};
pub use pipeline::{ExecuteRequest, ExecutionOutcome, Orchestrator};
pub use store::{
    ConfigStore, ExecutionLogger, JsonlExecutionLog, LogFilter, Manifest, ManifestReport,
    MemoryConfigStore, MemoryExecutionLog, TemplateSnapshot,
};
pub use types::{
    AuthDescriptor, ExecutionRecord, ExecutionStatus, NewExecutionRecord, Profile, ProfileRole,
    SecretRef, Template,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
