//! Upstream document store access.
//!
//! Everything the gateway needs from the store fits one contract:
//! forward a request, return the status and body. Failure statuses are
//! data, not errors — the gateway mirrors them to its caller unchanged.

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

use crate::{Error, Result};

/// Status and body as returned by an external collaborator.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// The "forward this request, return that response" contract to the
/// upstream FHIR store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// POST a transaction/batch bundle to the store root.
    async fn submit_transaction(&self, bundle: &Value) -> Result<UpstreamResponse>;

    /// Forward an arbitrary request to `base + path_and_query`.
    async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
    ) -> Result<UpstreamResponse>;

    /// GET a resource by relative path (e.g. `/Bundle/doc-1`).
    async fn fetch(&self, path: &str) -> Result<UpstreamResponse> {
        self.forward(Method::GET, path, None).await
    }
}

/// reqwest-backed store client.
pub struct ReqwestDocumentStore {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestDocumentStore {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn into_upstream(response: reqwest::Response) -> Result<UpstreamResponse> {
        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| Error::Internal(format!("Invalid upstream status: {e}")))?;
        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(UpstreamResponse { status, body })
    }
}

#[async_trait]
impl DocumentStore for ReqwestDocumentStore {
    async fn submit_transaction(&self, bundle: &Value) -> Result<UpstreamResponse> {
        let response = self.client.post(&self.base_url).json(bundle).send().await?;
        Self::into_upstream(response).await
    }

    async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
    ) -> Result<UpstreamResponse> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        Self::into_upstream(request.send().await?).await
    }
}
