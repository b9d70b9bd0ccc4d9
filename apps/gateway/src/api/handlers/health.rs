//! Liveness and key discovery endpoints.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;
use crate::{Error, Result};

pub async fn health() -> Response {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}

/// The gateway's public key in PEM (SPKI) and JWK form, for external
/// verifiers.
pub async fn public_keys(State(state): State<AppState>) -> Result<Response> {
    let pem = state.signature.public_key_pem()?;
    let jwk: Value = serde_json::from_str(&state.signature.public_key_jwk())
        .map_err(|e| Error::Internal(format!("JWK serialization failed: {e}")))?;
    Ok(Json(json!({ "pem": pem, "jwk": jwk })).into_response())
}
