//! Certificate-issuance collaborator.

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::Value;

use super::upstream::UpstreamResponse;
use crate::{Error, Result};

/// POSTs a QuestionnaireResponse-shaped payload and returns the issued
/// credential artifact.
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    async fn issue(&self, payload: &Value) -> Result<UpstreamResponse>;
}

pub struct HttpCertificateIssuer {
    client: reqwest::Client,
    url: String,
}

impl HttpCertificateIssuer {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl CertificateIssuer for HttpCertificateIssuer {
    async fn issue(&self, payload: &Value) -> Result<UpstreamResponse> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| Error::Internal(format!("Invalid issuance status: {e}")))?;
        let text = response.text().await?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(UpstreamResponse { status, body })
    }
}
