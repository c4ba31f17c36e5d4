//! One-shot execution command handler

use super::utils::{build_orchestrator, load_into_store};
use crate::cli::ExecuteArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::{redaction, timing::Timer};
use crate::output::OutputWriter;
use serde_json::{json, Map, Value};
use std::io::Read;
use std::path::Path;
use tracing::{debug, instrument};

/// Request body assembled from the command line
enum Body {
    Raw(Vec<u8>),
    Json(Value),
}

/// Handle the execute command
#[instrument(skip_all, fields(template_id = %args.template_id))]
pub async fn handle_execute(
    args: ExecuteArgs,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let manifest_path = config.manifest_path(args.manifest.as_deref())?;
    let loaded = load_into_store(&manifest_path)?;
    let execution_log = config.execution_log_path(args.execution_log.as_deref());
    let orchestrator = build_orchestrator(config, loaded.store, execution_log)?;

    let body = request_body(&args)?;
    if output.verbosity() > 0 {
        if let Body::Json(value) = &body {
            output.section("Request")?;
            output.data(&redaction::redacted(value))?;
        }
    }

    let spinner = output.spinner(&format!("Executing {}", args.template_id));
    let timer = Timer::with_details("execute", &args.template_id);

    let result = match body {
        Body::Raw(bytes) => orchestrator.execute_raw(&args.template_id, &bytes).await,
        Body::Json(value) => orchestrator.execute(&args.template_id, value).await,
    };

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    debug!(duration_ms = timer.elapsed().as_millis() as u64, ok = result.is_ok(), "Execution finished");

    let outcome = result?;
    output.outcome(&outcome)?;
    Ok(())
}

fn request_body(args: &ExecuteArgs) -> Result<Body> {
    if let Some(path) = &args.body {
        return read_body(path).map(Body::Raw);
    }

    let mut body = Map::new();
    if let Some(raw) = &args.data {
        let data: Value = serde_json::from_str(raw)
            .map_err(|e| Error::invalid_args(format!("--data is not valid JSON: {}", e)))?;
        body.insert("data".to_string(), data);
    }
    if !args.params.is_empty() {
        let params: Map<String, Value> = args
            .params
            .iter()
            .map(|(key, value)| (key.clone(), json!(value)))
            .collect();
        body.insert("params".to_string(), Value::Object(params));
    }
    if args.test {
        body.insert("is_test".to_string(), Value::Bool(true));
    }

    Ok(Body::Json(Value::Object(body)))
}

fn read_body(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes)?;
        return Ok(bytes);
    }

    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(std::fs::read(path)?)
}
