//! Stored-document signature verification.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use siegel_document::verify_signature;

use crate::state::AppState;
use crate::Result;

/// Fetch a stored bundle, strip the fields the store added after
/// signing, and verify the signature against the key registry. A
/// mismatch is a normal `verified: false`; upstream fetch failures are
/// mirrored.
pub async fn verify_bundle(
    State(state): State<AppState>,
    Path(bundle_id): Path<String>,
) -> Result<Response> {
    let fetched = state.store.fetch(&format!("/Bundle/{bundle_id}")).await?;
    if !fetched.is_success() {
        return Ok(fetched.into_response());
    }

    let verified = verify_signature(&fetched.body, &*state.key_registry)?;
    Ok((StatusCode::OK, Json(json!({ "verified": verified }))).into_response())
}
