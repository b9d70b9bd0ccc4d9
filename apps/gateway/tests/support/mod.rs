//! Shared test harness: in-memory collaborator doubles and a router
//! driver.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use siegel::config::{
    CertificatesConfig, Config, LoggingConfig, ReconciliationConfig, ServerConfig, SigningConfig,
    UpstreamConfig,
};
use siegel::services::{
    CertificateIssuer, DocumentStore, ReconciliationWorker, UpstreamResponse,
};
use siegel::state::AppState;

pub const BASE_URL: &str = "http://store.example.org/fhir";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// In-memory stand-in for the upstream FHIR store.
///
/// Transactions are answered with a transaction-response that assigns an
/// id per entry (honoring `assigned_document_id` for the document copy)
/// and the written resources become fetchable afterwards, so the verify
/// and reconciliation flows run against what was actually submitted.
#[derive(Default)]
pub struct MockDocumentStore {
    pub requests: Mutex<Vec<RecordedRequest>>,
    pub resources: Mutex<HashMap<String, Value>>,
    pub transaction_status: Mutex<Option<StatusCode>>,
    pub assigned_document_id: Mutex<Option<String>>,
}

impl MockDocumentStore {
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn insert_resource(&self, path: &str, resource: Value) {
        self.resources
            .lock()
            .unwrap()
            .insert(path.to_string(), resource);
    }

    pub fn resource(&self, path: &str) -> Option<Value> {
        self.resources.lock().unwrap().get(path).cloned()
    }

    pub fn set_transaction_status(&self, status: StatusCode) {
        *self.transaction_status.lock().unwrap() = Some(status);
    }

    pub fn set_assigned_document_id(&self, id: &str) {
        *self.assigned_document_id.lock().unwrap() = Some(id.to_string());
    }
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn submit_transaction(&self, bundle: &Value) -> siegel::Result<UpstreamResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: Method::POST,
            path: String::new(),
            body: Some(bundle.clone()),
        });

        if let Some(status) = *self.transaction_status.lock().unwrap() {
            if !status.is_success() {
                return Ok(UpstreamResponse {
                    status,
                    body: json!({
                        "resourceType": "OperationOutcome",
                        "issue": [{"severity": "error", "code": "processing"}]
                    }),
                });
            }
        }

        let entries = bundle
            .get("entry")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut response_entries = Vec::new();
        let mut counter = 0;
        for entry in entries {
            let method = entry["request"]["method"].as_str().unwrap_or("");
            let url = entry["request"]["url"].as_str().unwrap_or("");
            let (resource_type, id) = if method == "PUT" {
                let mut parts = url.splitn(2, '/');
                (
                    parts.next().unwrap_or("").to_string(),
                    parts.next().map(str::to_string),
                )
            } else {
                (url.to_string(), None)
            };
            counter += 1;
            let mut id = id.unwrap_or_else(|| format!("gen-{counter}"));
            if resource_type == "Bundle" {
                if let Some(assigned) = self.assigned_document_id.lock().unwrap().clone() {
                    id = assigned;
                }
            }

            if let Some(resource) = entry.get("resource") {
                self.insert_resource(&format!("/{resource_type}/{id}"), resource.clone());
            }

            let mut response_entry = json!({
                "response": {
                    "status": "201 Created",
                    "location": format!("{resource_type}/{id}/_history/1"),
                }
            });
            if let Some(full_url) = entry.get("fullUrl") {
                response_entry["fullUrl"] = full_url.clone();
            }
            response_entries.push(response_entry);
        }

        Ok(UpstreamResponse {
            status: StatusCode::OK,
            body: json!({
                "resourceType": "Bundle",
                "type": "transaction-response",
                "entry": response_entries,
            }),
        })
    }

    async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
    ) -> siegel::Result<UpstreamResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.clone(),
            path: path_and_query.to_string(),
            body: body.clone(),
        });

        let path = path_and_query
            .split('?')
            .next()
            .unwrap_or(path_and_query)
            .to_string();
        if method == Method::GET {
            match self.resource(&path) {
                Some(resource) => Ok(UpstreamResponse {
                    status: StatusCode::OK,
                    body: resource,
                }),
                None => Ok(UpstreamResponse {
                    status: StatusCode::NOT_FOUND,
                    body: json!({
                        "resourceType": "OperationOutcome",
                        "issue": [{"severity": "error", "code": "not-found"}]
                    }),
                }),
            }
        } else if method == Method::PUT {
            let resource = body.unwrap_or(Value::Null);
            self.insert_resource(&path, resource.clone());
            Ok(UpstreamResponse {
                status: StatusCode::OK,
                body: resource,
            })
        } else {
            Ok(UpstreamResponse {
                status: StatusCode::OK,
                body: body.unwrap_or(Value::Null),
            })
        }
    }
}

/// Issuance double recording every payload it receives.
#[derive(Default)]
pub struct MockIssuer {
    pub payloads: Mutex<Vec<Value>>,
}

#[async_trait]
impl CertificateIssuer for MockIssuer {
    async fn issue(&self, payload: &Value) -> siegel::Result<UpstreamResponse> {
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(UpstreamResponse {
            status: StatusCode::OK,
            body: json!({ "credential": "issued" }),
        })
    }
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
        },
        upstream: UpstreamConfig {
            fhir_url: BASE_URL.to_string(),
            source_system: "siegel-tests".to_string(),
            timeout_seconds: 5,
        },
        signing: SigningConfig {
            key_file: None,
            signer_value: "test-signer".to_string(),
            signer_system: Some("example.system.com".to_string()),
            known_keys: vec![],
        },
        certificates: CertificatesConfig::default(),
        reconciliation: ReconciliationConfig {
            max_attempts: 3,
            retry_delay_seconds: 0,
            queue_capacity: 16,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            json: false,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MockDocumentStore>,
    pub issuer: Arc<MockIssuer>,
    _worker: ReconciliationWorker,
}

pub fn test_app() -> TestApp {
    let store = Arc::new(MockDocumentStore::default());
    let issuer = Arc::new(MockIssuer::default());
    let (state, worker) = AppState::with_collaborators(
        test_config(),
        store.clone(),
        Some(issuer.clone() as Arc<dyn CertificateIssuer>),
    )
    .expect("test state");
    TestApp {
        router: siegel::api::create_router(state.clone()),
        state,
        store,
        issuer,
        _worker: worker,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&value)?)
            }
            None => Body::empty(),
        };
        let response = self.router.clone().oneshot(builder.body(body)?).await?;
        let status = response.status();
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await?
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }
}

/// A minimal clinical document bundle fixture.
pub fn document_bundle() -> Value {
    json!({
        "resourceType": "Bundle",
        "type": "document",
        "timestamp": "2023-05-01T10:00:00Z",
        "entry": [
            {"resource": {"resourceType": "Composition", "subject": {"reference": "Patient/p1"}}},
            {"resource": {
                "resourceType": "Patient",
                "id": "p1",
                "name": [{"given": ["Eddie"], "family": "Murphy"}],
                "birthDate": "1986-09-19",
                "gender": "male",
                "identifier": [{"value": "1234567890"}]
            }},
            {"resource": {
                "resourceType": "Immunization",
                "id": "imm-1",
                "vaccineCode": {"coding": [{"code": "XM9QW8"}]},
                "lotNumber": "PT123F",
                "occurrenceDateTime": "2021-07-08",
                "protocolApplied": [{
                    "doseNumberPositiveInt": 2,
                    "targetDisease": [{"coding": [{"code": "1D47"}]}]
                }]
            }},
            {"resource": {"resourceType": "Organization", "id": "org-1", "name": "Ministry of Health"}}
        ]
    })
}
