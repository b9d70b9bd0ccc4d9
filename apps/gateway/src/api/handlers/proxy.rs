//! Raw pass-through proxy to the upstream store.

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};

use super::parse_optional_json;
use crate::state::AppState;
use crate::Result;

pub async fn forward(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response> {
    let mut target = format!("/{path}");
    if let Some(query) = query {
        target.push('?');
        target.push_str(&query);
    }
    let body = parse_optional_json(&body)?;
    Ok(state
        .store
        .forward(method, &target, body)
        .await?
        .into_response())
}

/// System-level requests against the store root (e.g. raw transaction
/// bundles a client assembled itself).
pub async fn forward_root(
    State(state): State<AppState>,
    method: Method,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response> {
    let target = match query {
        Some(query) => format!("?{query}"),
        None => String::new(),
    };
    let body = parse_optional_json(&body)?;
    Ok(state
        .store
        .forward(method, &target, body)
        .await?
        .into_response())
}
