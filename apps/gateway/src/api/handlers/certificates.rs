//! Certificate payload synthesis and issuance.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use siegel_certificates::{ddcc, dvc, icvp};
use siegel_document::Bundle;

use super::parse_json;
use crate::state::AppState;
use crate::{Error, Result};

/// Build the profile payload from a clinical document bundle and post it
/// to the issuance service. Without a configured issuance endpoint the
/// payload itself is returned.
pub async fn issue(
    State(state): State<AppState>,
    Path(profile): Path<String>,
    body: Bytes,
) -> Result<Response> {
    let document = parse_json(&body)?;
    let bundle = Bundle::from_value(&document)
        .map_err(|e| Error::MalformedDocument(format!("not a Bundle: {e}")))?;

    let patient = require_resource(&bundle, "Patient")?;
    let immunization = require_resource(&bundle, "Immunization")?;

    let payload = match profile.as_str() {
        "ddcc" => ddcc::build(patient, immunization, require_resource(&bundle, "Organization")?)?,
        "dvc" => dvc::build(patient, immunization, require_resource(&bundle, "Organization")?)?,
        "icvp" => icvp::build(patient, immunization)?,
        _ => {
            return Err(Error::InvalidRequest(format!(
                "unknown certificate profile '{profile}'"
            )))
        }
    };

    match &state.issuer {
        Some(issuer) => Ok(issuer.issue(&payload).await?.into_response()),
        None => {
            tracing::debug!(profile, "No issuance endpoint configured, returning payload");
            Ok((StatusCode::OK, Json(payload)).into_response())
        }
    }
}

fn require_resource<'a>(bundle: &'a Bundle, resource_type: &str) -> Result<&'a Value> {
    bundle.find_resource(resource_type).ok_or_else(|| {
        Error::IncompleteClinicalData(format!("document has no {resource_type} entry"))
    })
}
