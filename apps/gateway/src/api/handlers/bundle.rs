//! Bundle endpoint: sign everything, expand document creates.

use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};

use super::{parse_json, parse_optional_json};
use crate::state::AppState;
use crate::Result;

pub async fn bundle(
    State(state): State<AppState>,
    method: Method,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response> {
    match method.as_str() {
        "POST" | "PUT" => {
            let body = parse_json(&body)?;
            let response = state.submission.submit_bundle(method, body).await?;
            Ok(response.into_response())
        }
        _ => {
            // Reads (searches, capability probes) pass straight through.
            let mut path = "/Bundle".to_string();
            if let Some(query) = query {
                path.push('?');
                path.push_str(&query);
            }
            let body = parse_optional_json(&body)?;
            Ok(state.store.forward(method, &path, body).await?.into_response())
        }
    }
}
