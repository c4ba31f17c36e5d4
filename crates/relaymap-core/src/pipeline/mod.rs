//! Execution pipeline
//!
//! One execution runs `SelectInput -> [FetchSource] -> ApplyRules ->
//! [SendTarget] -> LogOutcome`. Configuration is read once up front; the
//! outcome is logged exactly once whatever happens after that read.

pub mod request;


use crate::http::Upstream;
use crate::mapping::{RuleSet, TransformRegistry};
use crate::store::{ConfigStore, ExecutionLogger, TemplateSnapshot};
use crate::types::{ExecutionStatus, NewExecutionRecord};
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub use request::{ExecuteRequest, ExecutionOutcome, MALFORMED_PAYLOAD};

/// Message for templates without an active version
pub const NO_ACTIVE_VERSION: &str = "No active version found for this template";

/// Message for passive sources called without a body
pub const NO_PASSIVE_INPUT: &str = "No input payload provided for passive source";

/// What is known about an execution so far, for the log entry
#[derive(Debug, Default)]
struct Attempt {
    is_test: bool,
    input: Option<Value>,
    output: Option<Value>,
}

/// Where the mapping input comes from
enum InputSource {
    Provided(Value),
    Fetch,
}

/// Drives executions against a config store, an upstream and a logger
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<dyn ConfigStore>,
    upstream: Arc<dyn Upstream>,
    logger: Arc<dyn ExecutionLogger>,
    registry: Arc<TransformRegistry>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("transforms", &self.registry.names())
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator using the built-in transforms
    pub fn new(
        config: Arc<dyn ConfigStore>,
        upstream: Arc<dyn Upstream>,
        logger: Arc<dyn ExecutionLogger>,
    ) -> Self {
        Self {
            config,
            upstream,
            logger,
            registry: Arc::new(TransformRegistry::with_builtins()),
        }
    }

    /// Replace the transform registry
    pub fn with_registry(mut self, registry: TransformRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn logger(&self) -> &Arc<dyn ExecutionLogger> {
        &self.logger
    }

    /// Execute `template_id` with a JSON body
    #[instrument(skip(self, body), fields(template_id = %template_id))]
    pub async fn execute(&self, template_id: &str, body: Value) -> Result<ExecutionOutcome> {
        let snapshot = self.snapshot(template_id)?;
        self.execute_snapshot(&snapshot, ExecuteRequest::from_body(body)).await
    }

    /// Execute `template_id` with a raw request body
    ///
    /// A body that is not a JSON object is logged as a failed execution.
    #[instrument(skip(self, bytes), fields(template_id = %template_id, bytes = bytes.len()))]
    pub async fn execute_raw(&self, template_id: &str, bytes: &[u8]) -> Result<ExecutionOutcome> {
        let snapshot = self.snapshot(template_id)?;
        self.execute_snapshot(&snapshot, ExecuteRequest::from_bytes(bytes)).await
    }

    fn snapshot(&self, template_id: &str) -> Result<TemplateSnapshot> {
        self.config.snapshot(template_id)?.ok_or_else(|| {
            debug!("Template not found");
            Error::TemplateNotFound {
                id: template_id.to_string(),
            }
        })
    }

    async fn execute_snapshot(
        &self,
        snapshot: &TemplateSnapshot,
        request: Result<ExecuteRequest>,
    ) -> Result<ExecutionOutcome> {
        let mut attempt = Attempt::default();
        let result = match request {
            Ok(request) => self.run(snapshot, request, &mut attempt).await,
            Err(err) => Err(err),
        };

        match &result {
            Ok(outcome) => info!(
                fields = outcome.mapped_data.len(),
                sent = outcome.target_response.is_some(),
                "Execution succeeded"
            ),
            Err(err) if err.is_client_error() => warn!(error = %err, "Execution rejected"),
            Err(err) => error!(error = %err, class = %err.class(), "Execution failed"),
        }

        self.log_outcome(snapshot, attempt, result.as_ref().err()).await;
        result
    }

    async fn run(
        &self,
        snapshot: &TemplateSnapshot,
        request: ExecuteRequest,
        attempt: &mut Attempt,
    ) -> Result<ExecutionOutcome> {
        attempt.is_test = request.is_test;

        let source = select_input(snapshot, &request)?;
        if let InputSource::Provided(input) = &source {
            attempt.input = Some(input.clone());
        }

        let ruleset: &Arc<RuleSet> = snapshot
            .ruleset
            .as_ref()
            .ok_or_else(|| Error::validation(NO_ACTIVE_VERSION))?;

        let input = match source {
            InputSource::Provided(input) => input,
            InputSource::Fetch => {
                debug!(source = %snapshot.source.name, "Fetching input from source");
                let fetched = self.upstream.fetch(&snapshot.source, &request.params).await?;
                attempt.input = Some(fetched.clone());
                fetched
            }
        };

        let mapped_data = ruleset.execute(&input, &self.registry);
        let mapped = Value::Object(mapped_data.clone());

        let target_response = self.upstream.send(&snapshot.target, &mapped).await?;
        attempt.output = Some(mapped);

        Ok(ExecutionOutcome {
            mapped_data,
            target_response,
        })
    }

    async fn log_outcome(&self, snapshot: &TemplateSnapshot, attempt: Attempt, error: Option<&Error>) {
        let ruleset = snapshot.ruleset.as_ref();
        let entry = NewExecutionRecord {
            status: if error.is_none() {
                ExecutionStatus::Success
            } else {
                ExecutionStatus::Error
            },
            template_id: Some(snapshot.template.id.clone()),
            template_name: Some(snapshot.template.name.clone()),
            version_id: ruleset.map(|r| r.id.clone()),
            version_number: ruleset.map(|r| r.version_number),
            input_data: attempt.input,
            output_data: attempt.output,
            error_message: error.map(|e| e.to_string()),
            is_test: attempt.is_test,
        };

        if let Err(err) = self.logger.record(entry).await {
            error!(error = %err, "Failed to record execution log");
        }
    }
}

fn select_input(snapshot: &TemplateSnapshot, request: &ExecuteRequest) -> Result<InputSource> {
    if let Some(data) = &request.data {
        return Ok(InputSource::Provided(data.clone()));
    }

    if snapshot.source.is_passive() {
        if request.body.is_empty() {
            return Err(Error::validation(NO_PASSIVE_INPUT));
        }
        return Ok(InputSource::Provided(Value::Object(request.body.clone())));
    }

    Ok(InputSource::Fetch)
}
