//! HTTP server command handler

use super::utils::{build_orchestrator, load_into_store};
use crate::cli::ServeArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputWriter;
use crate::server;
use std::sync::Arc;
use tracing::instrument;

/// Handle the serve command
#[instrument(skip_all, fields(bind = ?args.bind))]
pub async fn handle_serve(args: ServeArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let addr = args.bind.unwrap_or(config.server.bind);
    let manifest_path = config.manifest_path(args.manifest.as_deref())?;

    let loaded = load_into_store(&manifest_path)?;
    output.info(&format!(
        "Loaded {} template(s) from {}",
        loaded.report.templates.len(),
        loaded.path.display()
    ))?;

    let execution_log = config.execution_log_path(args.execution_log.as_deref());
    let orchestrator = build_orchestrator(config, loaded.store, execution_log)?;

    output.success(&format!("Serving on http://{}", addr))?;
    server::serve(addr, Arc::new(orchestrator)).await
}
