//! HTTP surface for the orchestrator
//!
//! Routes:
//! - `POST /templates/{id}/execute` runs one execution with the raw body
//! - `GET /logs` lists execution records, newest first
//! - `GET /healthz` liveness probe

use crate::error::{Error, Result};
use crate::logging::{generate_request_id, redaction};
use anyhow::Context;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use relaymap_core::{ExecutionOutcome, ExecutionRecord, ExecutionStatus, LogFilter, Orchestrator};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, info_span, warn};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Error body returned by every route: `{"error": message}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<relaymap_core::Error> for ApiError {
    fn from(err: relaymap_core::Error) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(class = %err.class(), error = %err, "Request failed");
        } else {
            warn!(class = %err.class(), error = %err, "Request rejected");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Clone, Copy, Default)]
struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&generate_request_id())
            .ok()
            .map(RequestId::new)
    }
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = AppState { orchestrator };

    Router::new()
        .route("/templates/{id}/execute", post(execute))
        .route("/logs", get(list_logs))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            info_span!(
                "http_request",
                request_id = %request_id,
                method = %request.method(),
                path = %request.uri().path(),
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeReqId))
}

/// Bind `addr` and serve until ctrl-c
pub async fn serve(addr: SocketAddr, orchestrator: Arc<Orchestrator>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))
        .map_err(Error::Server)?;
    let local = listener
        .local_addr()
        .context("failed to read bound address")
        .map_err(Error::Server)?;
    info!(addr = %local, "Listening");

    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server stopped unexpectedly")
        .map_err(Error::Server)?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn execute(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
    body: Bytes,
) -> std::result::Result<Json<ExecutionOutcome>, ApiError> {
    if tracing::enabled!(tracing::Level::DEBUG) {
        if let Ok(value) = serde_json::from_slice::<Value>(&body) {
            debug!(template_id = %template_id, body = %redaction::redacted(&value), "Execute request");
        }
    }

    let outcome = state.orchestrator.execute_raw(&template_id, &body).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Default, Deserialize)]
struct LogQuery {
    template_id: Option<String>,
    status: Option<String>,
    limit: Option<usize>,
}

impl LogQuery {
    fn into_filter(self) -> std::result::Result<LogFilter, ApiError> {
        let status = match self.status.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_status(raw)?),
        };
        Ok(LogFilter {
            template_id: self.template_id.filter(|id| !id.is_empty()),
            status,
            limit: self.limit,
        })
    }
}

fn parse_status(raw: &str) -> std::result::Result<ExecutionStatus, ApiError> {
    match raw.to_ascii_uppercase().as_str() {
        "SUCCESS" => Ok(ExecutionStatus::Success),
        "ERROR" => Ok(ExecutionStatus::Error),
        _ => Err(ApiError::bad_request(format!(
            "Invalid status '{}': expected SUCCESS or ERROR",
            raw
        ))),
    }
}

async fn list_logs(
    State(state): State<AppState>,
    query: std::result::Result<Query<LogQuery>, QueryRejection>,
) -> std::result::Result<Json<Vec<ExecutionRecord>>, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let filter = query.into_filter()?;
    let records = state.orchestrator.logger().list(&filter).await?;
    Ok(Json(records))
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
