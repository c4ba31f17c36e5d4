//! Configuration and execution-log storage
//!
//! The pipeline only sees two seams: [`ConfigStore::snapshot`] for one
//! consistent read of everything an execution needs, and [`ExecutionLogger`]
//! for the audit trail.

pub mod config;
pub mod jsonl;
pub mod log;
pub mod manifest;

use crate::mapping::RuleSet;
use crate::types::{Profile, Template};
use crate::Result;
use std::sync::Arc;

pub use config::{MemoryConfigStore, NewProfile, NewTemplate, SyncReport};
pub use jsonl::JsonlExecutionLog;
pub use log::{ExecutionLogger, LogFilter, MemoryExecutionLog};
pub use manifest::{AdapterSpec, Manifest, ManifestReport, TemplateSpec, VersionSpec};

/// Everything an execution reads from configuration, taken in one go
///
/// The rule set is shared, so re-activating another version while an
/// execution is in flight does not affect it.
#[derive(Debug, Clone)]
pub struct TemplateSnapshot {
    pub template: Template,
    pub source: Profile,
    pub target: Profile,
    /// The active rule set, if the template has one
    pub ruleset: Option<Arc<RuleSet>>,
}

/// Read side of the configuration store used by the pipeline
pub trait ConfigStore: Send + Sync {
    /// `Ok(None)` when no template has this id
    fn snapshot(&self, template_id: &str) -> Result<Option<TemplateSnapshot>>;
}
