//! Gateway error taxonomy and HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The request body or document tree could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Serialization(String),

    /// The submitted document is structurally unusable.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A certificate builder is missing a required mapped field.
    #[error("incomplete clinical data: {0}")]
    IncompleteClinicalData(String),

    /// The upstream store or issuance service could not be reached at
    /// all. Failure *statuses* from upstream are not errors — they are
    /// mirrored to the caller verbatim.
    #[error("upstream request failed: {0}")]
    UpstreamUnreachable(String),

    /// Unparsable configured key material or undecodable signature
    /// material on a stored document.
    #[error("key material error: {0}")]
    KeyMaterial(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Serialization(_) | Error::Internal(_) | Error::KeyMaterial(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::MalformedDocument(_) | Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::IncompleteClinicalData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn issue_code(&self) -> &'static str {
        match self {
            Error::MalformedDocument(_) | Error::InvalidRequest(_) => "invalid",
            Error::IncompleteClinicalData(_) => "required",
            Error::UpstreamUnreachable(_) => "transient",
            _ => "exception",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let outcome = json!({
            "resourceType": "OperationOutcome",
            "issue": [{
                "severity": "error",
                "code": self.issue_code(),
                "diagnostics": self.to_string(),
            }]
        });
        (status, Json(outcome)).into_response()
    }
}

impl From<siegel_document::DocumentError> for Error {
    fn from(err: siegel_document::DocumentError) -> Self {
        use siegel_document::DocumentError;
        match err {
            DocumentError::Canonical(e) => Error::Serialization(e.to_string()),
            DocumentError::Key(e) => Error::KeyMaterial(e.to_string()),
            DocumentError::MalformedDocument(msg) => Error::MalformedDocument(msg),
            DocumentError::MalformedSignature(msg) => Error::KeyMaterial(msg),
            DocumentError::Serialization(e) => Error::Internal(e.to_string()),
        }
    }
}

impl From<siegel_certificates::CertificateError> for Error {
    fn from(err: siegel_certificates::CertificateError) -> Self {
        use siegel_certificates::CertificateError;
        match err {
            CertificateError::IncompleteClinicalData { field } => {
                Error::IncompleteClinicalData(field)
            }
            CertificateError::Serialization(e) => Error::Internal(e.to_string()),
        }
    }
}

impl From<siegel_signature::KeyError> for Error {
    fn from(err: siegel_signature::KeyError) -> Self {
        Error::KeyMaterial(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::UpstreamUnreachable(err.to_string())
    }
}
