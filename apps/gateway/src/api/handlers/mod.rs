//! Request handlers

pub mod bundle;
pub mod certificates;
pub mod health;
pub mod proxy;
pub mod verify;

use axum::body::Bytes;
use serde_json::Value;

use crate::{Error, Result};

/// Parse a request body that may legitimately be empty (GET/DELETE
/// pass-through traffic).
pub(crate) fn parse_optional_json(body: &Bytes) -> Result<Option<Value>> {
    if body.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| Error::InvalidRequest(format!("request body is not valid JSON: {e}")))
}

/// Parse a required JSON body.
pub(crate) fn parse_json(body: &Bytes) -> Result<Value> {
    parse_optional_json(body)?
        .ok_or_else(|| Error::InvalidRequest("request body must not be empty".to_string()))
}
