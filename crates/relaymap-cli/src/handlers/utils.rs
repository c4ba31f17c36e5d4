//! Shared utilities for command handlers

use crate::config::{self, Config};
use crate::error::{Error, Result};
use relaymap_core::{
    EnvSecretResolver, ExecutionLogger, HttpConnector, JsonlExecutionLog, Manifest,
    ManifestReport, MemoryConfigStore, MemoryExecutionLog, Orchestrator,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A manifest loaded into a fresh in-memory store
pub struct LoadedManifest {
    pub path: PathBuf,
    pub manifest: Manifest,
    pub store: Arc<MemoryConfigStore>,
    pub report: ManifestReport,
}

/// Read, check and apply the manifest at `path`
pub fn load_into_store(path: &Path) -> Result<LoadedManifest> {
    let manifest = config::load_manifest(path)?;

    let problems = manifest.problems();
    if !problems.is_empty() {
        return Err(Error::ManifestInvalid {
            path: path.to_path_buf(),
            problems,
        });
    }

    let store = Arc::new(MemoryConfigStore::new());
    let report = manifest.apply(&store)?;
    debug!(
        path = %path.display(),
        templates = report.templates.len(),
        versions = report.versions,
        "Manifest loaded"
    );

    Ok(LoadedManifest {
        path: path.to_path_buf(),
        manifest,
        store,
        report,
    })
}

/// Execution log sink: JSON lines when a path is configured, memory otherwise
pub fn execution_logger(path: Option<PathBuf>) -> Arc<dyn ExecutionLogger> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Recording executions to file");
            Arc::new(JsonlExecutionLog::new(path))
        }
        None => {
            info!("Recording executions in memory only");
            Arc::new(MemoryExecutionLog::new())
        }
    }
}

/// Wire a store, the HTTP connector and a logger into an orchestrator
pub fn build_orchestrator(
    config: &Config,
    store: Arc<MemoryConfigStore>,
    execution_log: Option<PathBuf>,
) -> Result<Orchestrator> {
    let connector = HttpConnector::new(config.connector_config()?, Arc::new(EnvSecretResolver))?;
    Ok(Orchestrator::new(
        store,
        Arc::new(connector),
        execution_logger(execution_log),
    ))
}
