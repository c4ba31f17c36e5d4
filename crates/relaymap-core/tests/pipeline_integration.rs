//! End-to-end executions: manifest, HTTP connector, JSONL log and a stub server

mod common;

use common::StubUpstream;
use relaymap_core::types::ExecutionStatus;
use relaymap_core::{
    ConnectorConfig, Error, HttpConnector, JsonlExecutionLog, LogFilter, Manifest,
    MemoryConfigStore, Orchestrator, StaticSecretResolver,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    stub: StubUpstream,
    store: Arc<MemoryConfigStore>,
    orchestrator: Orchestrator,
    _dir: TempDir,
}

impl Harness {
    async fn new() -> Self {
        let stub = StubUpstream::start().await;
        let store = Arc::new(MemoryConfigStore::new());

        let manifest = Manifest::from_json(json!({
            "adapters": [
                {"name": "erp", "type": "SOURCE", "api_url": stub.url("/companies/{cnpj}"),
                 "auth": {"type": "Bearer", "token": "env:ERP_TOKEN"}},
                {"name": "webhook", "type": "SOURCE"},
                {"name": "crm", "type": "TARGET", "api_url": stub.url("/accounts"),
                 "auth": {"type": "ApiKey", "value": "env:CRM_KEY"}},
                {"name": "sink", "type": "TARGET", "api_url": ""}
            ],
            "templates": [
                {
                    "id": "erp-to-crm",
                    "name": "ERP to CRM",
                    "source": "erp",
                    "target": "crm",
                    "versions": [{"rules": [
                        {"source_path": "company.tax_id", "target_field": "document", "transform": "REMOVE_PUNCTUATION"},
                        {"source_path": "company.name", "target_field": "account_name", "transform": "UPPERCASE"},
                        {"source_path": "company.founded", "target_field": "since", "transform": "DATE_FORMAT(%d/%m/%Y)"},
                        {"source_path": "revenue", "target_field": "revenue", "transform": "ROUND(2)"},
                        {"source_path": "$.company.address.city", "target_field": "city"},
                        {"source_path": "tags.1", "target_field": "segment"},
                        {"source_path": "company.website", "target_field": "website", "transform": "DEFAULT(n/a)"}
                    ]}]
                },
                {
                    "id": "hook-to-sink",
                    "name": "Webhook to sink",
                    "source": "webhook",
                    "target": "sink",
                    "versions": [{"rules": [
                        {"source_path": "order.id", "target_field": "order_id"},
                        {"source_path": "order.customer", "target_field": "customer", "transform": "TRIM"}
                    ]}]
                }
            ]
        }))
        .unwrap();
        manifest.apply(&store).unwrap();

        let resolver = StaticSecretResolver::new()
            .with("ERP_TOKEN", "erp-token")
            .with("CRM_KEY", "crm-key");
        let connector = HttpConnector::new(ConnectorConfig::default(), Arc::new(resolver)).unwrap();

        let dir = TempDir::new().unwrap();
        let log = JsonlExecutionLog::new(dir.path().join("logs").join("executions.jsonl"));

        let orchestrator = Orchestrator::new(store.clone(), Arc::new(connector), Arc::new(log));

        Self {
            stub,
            store,
            orchestrator,
            _dir: dir,
        }
    }

    async fn records(&self, template_id: &str) -> Vec<relaymap_core::ExecutionRecord> {
        self.orchestrator
            .logger()
            .list(&LogFilter {
                template_id: Some(template_id.to_string()),
                ..LogFilter::default()
            })
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_fetch_map_send_and_log() {
    let harness = Harness::new().await;

    let outcome = harness
        .orchestrator
        .execute("erp-to-crm", json!({"params": {"cnpj": "12345678000190"}}))
        .await
        .unwrap();

    let expected = json!({
        "document": "12345678000190",
        "account_name": "ACME LTDA",
        "since": "15/03/2010",
        "revenue": 1234.57,
        "city": "Sao Paulo",
        "segment": "retail",
        "website": "n/a"
    });
    assert_eq!(Value::Object(outcome.mapped_data.clone()), expected);
    assert_eq!(
        outcome.target_response,
        Some(json!({"id": "acc-1", "received": expected}))
    );

    let fetches = harness.stub.requests_to("/companies/12345678000190");
    assert_eq!(fetches.len(), 1);
    assert_eq!(fetches[0].header("authorization"), Some("Bearer erp-token"));

    let sends = harness.stub.requests_to("/accounts");
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].header("x-api-key"), Some("crm-key"));

    let records = harness.records("erp-to-crm").await;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status, ExecutionStatus::Success);
    assert_eq!(record.template_name.as_deref(), Some("ERP to CRM"));
    assert_eq!(record.version_number, Some(1));
    assert_eq!(record.input_data.as_ref().unwrap()["cnpj"], json!("12345678000190"));
    assert_eq!(record.output_data, Some(expected));
    assert!(!record.is_test);
}

#[tokio::test]
async fn test_passive_source_and_target() {
    let harness = Harness::new().await;

    let outcome = harness
        .orchestrator
        .execute_raw(
            "hook-to-sink",
            br#"{"order": {"id": 77, "customer": "  Maria  "}, "is_test": true}"#,
        )
        .await
        .unwrap();

    assert_eq!(
        Value::Object(outcome.mapped_data),
        json!({"order_id": 77, "customer": "Maria"})
    );
    assert_eq!(outcome.target_response, None);
    assert!(harness.stub.requests().is_empty());

    let records = harness.records("hook-to-sink").await;
    assert_eq!(records.len(), 1);
    assert!(records[0].is_test);
    assert_eq!(
        records[0].input_data,
        Some(json!({"order": {"id": 77, "customer": "  Maria  "}, "is_test": true}))
    );
}

#[tokio::test]
async fn test_explicit_data_skips_the_fetch() {
    let harness = Harness::new().await;

    let outcome = harness
        .orchestrator
        .execute(
            "erp-to-crm",
            json!({"data": {"company": {"name": "Beta", "tax_id": "1.2-3"}}}),
        )
        .await
        .unwrap();

    assert_eq!(outcome.mapped_data["account_name"], json!("BETA"));
    assert_eq!(outcome.mapped_data["document"], json!("123"));
    assert_eq!(outcome.mapped_data["since"], Value::Null);
    assert!(harness.stub.requests_to("/companies/12345678000190").is_empty());
    assert_eq!(harness.stub.requests_to("/accounts").len(), 1);
}

#[tokio::test]
async fn test_failed_fetch_is_logged_once() {
    let harness = Harness::new().await;

    let err = harness
        .orchestrator
        .execute("erp-to-crm", json!({"params": {"cnpj": "missing"}}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamFetch(_)));
    assert_eq!(err.status_code(), 500);
    assert!(harness.stub.requests_to("/accounts").is_empty());

    let records = harness.records("erp-to-crm").await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ExecutionStatus::Error);
    assert_eq!(records[0].input_data, None);
    assert_eq!(records[0].output_data, None);
    assert_eq!(
        records[0].error_message.as_deref(),
        Some("Fetch error: HTTP 404: Company not found")
    );
}

#[tokio::test]
async fn test_missing_param_is_a_client_error() {
    let harness = Harness::new().await;

    let err = harness
        .orchestrator
        .execute("erp-to-crm", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert!(harness.stub.requests().is_empty());

    let records = harness.records("erp-to-crm").await;
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].error_message.as_deref(),
        Some("Missing required URL parameter: cnpj")
    );
}

#[tokio::test]
async fn test_log_filters_across_templates() {
    let harness = Harness::new().await;

    harness
        .orchestrator
        .execute("hook-to-sink", json!({"order": {"id": 1}}))
        .await
        .unwrap();
    harness
        .orchestrator
        .execute("hook-to-sink", json!({}))
        .await
        .unwrap_err();
    harness
        .orchestrator
        .execute("erp-to-crm", json!({"params": {"cnpj": "missing"}}))
        .await
        .unwrap_err();

    let errors = harness
        .orchestrator
        .logger()
        .list(&LogFilter {
            status: Some(ExecutionStatus::Error),
            ..LogFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(errors.len(), 2);

    let latest = harness
        .orchestrator
        .logger()
        .list(&LogFilter {
            template_id: Some("hook-to-sink".to_string()),
            limit: Some(1),
            ..LogFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].status, ExecutionStatus::Error);
}

#[tokio::test]
async fn test_unknown_template_is_not_logged() {
    let harness = Harness::new().await;

    let err = harness
        .orchestrator
        .execute("nope", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);

    let all = harness
        .orchestrator
        .logger()
        .list(&LogFilter::default())
        .await
        .unwrap();
    assert!(all.is_empty());
    assert!(harness.store.template("nope").unwrap().is_none());
}
