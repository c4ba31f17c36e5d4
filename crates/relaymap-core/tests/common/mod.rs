//! Shared test support for integration tests
//!
//! [`StubUpstream`] is a small axum server on an ephemeral port playing both
//! the source and the target side of an execution.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use relaymap_core::{AuthDescriptor, Profile, ProfileRole};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A request as the stub saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

#[derive(Clone, Default)]
struct StubState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubState {
    fn record(&self, method: Method, uri: &OriginalUri, headers: HeaderMap, body: &[u8]) {
        let request = RecordedRequest {
            method,
            path: uri.0.path().to_string(),
            headers,
            body: serde_json::from_slice(body).ok(),
        };
        self.requests.lock().unwrap().push(request);
    }
}

/// Running stub server; shuts down when dropped
pub struct StubUpstream {
    base_url: String,
    state: StubState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl StubUpstream {
    /// Bind to `127.0.0.1:0` and start serving on the current runtime
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = StubState::default();

        let app = Router::new()
            .route("/companies/{cnpj}", get(company))
            .route("/maintenance", get(maintenance))
            .route("/text", get(plain_text))
            .route("/slow", get(slow))
            .route("/accounts", post(create_account))
            .route("/plain", post(accept_plain))
            .route("/reject", post(reject))
            .with_state(state.clone());

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            shutdown: Some(tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

impl Drop for StubUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn company(
    State(state): State<StubState>,
    Path(cnpj): Path<String>,
    uri: OriginalUri,
    headers: HeaderMap,
) -> Response {
    state.record(Method::GET, &uri, headers, &[]);

    if cnpj == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "Company not found"}))).into_response();
    }

    Json(json!({
        "cnpj": cnpj,
        "company": {
            "tax_id": "12.345.678/0001-90",
            "name": "Acme Ltda",
            "founded": "2010-03-15T09:30:00Z",
            "address": {"city": "Sao Paulo"}
        },
        "revenue": 1234.5678,
        "tags": ["b2b", "retail"]
    }))
    .into_response()
}

async fn maintenance(State(state): State<StubState>, uri: OriginalUri, headers: HeaderMap) -> Response {
    state.record(Method::GET, &uri, headers, &[]);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": {"message": "Down for maintenance"}})),
    )
        .into_response()
}

async fn plain_text(State(state): State<StubState>, uri: OriginalUri, headers: HeaderMap) -> Response {
    state.record(Method::GET, &uri, headers, &[]);
    (StatusCode::OK, "just some text").into_response()
}

async fn slow(State(state): State<StubState>, uri: OriginalUri, headers: HeaderMap) -> Response {
    state.record(Method::GET, &uri, headers, &[]);
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({})).into_response()
}

async fn create_account(
    State(state): State<StubState>,
    uri: OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(Method::POST, &uri, headers, &body);
    let received: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (
        StatusCode::CREATED,
        Json(json!({"id": "acc-1", "received": received})),
    )
        .into_response()
}

async fn accept_plain(
    State(state): State<StubState>,
    uri: OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(Method::POST, &uri, headers, &body);
    (StatusCode::ACCEPTED, "queued").into_response()
}

async fn reject(
    State(state): State<StubState>,
    uri: OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(Method::POST, &uri, headers, &body);
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({"message": "document is invalid"})),
    )
        .into_response()
}

/// A profile with a fixed id derived from its name
pub fn profile(name: &str, role: ProfileRole, api_url: Option<String>, auth: AuthDescriptor) -> Profile {
    Profile {
        id: format!("{}-id", name),
        name: name.to_string(),
        role,
        api_url,
        auth,
        schema: None,
    }
}
