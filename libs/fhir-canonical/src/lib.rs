//! RFC 8785 (JCS) canonical serialization of JSON document trees.
//!
//! Signing and verification both operate on the canonical byte form of a
//! document, so two structurally equal trees must serialize to identical
//! bytes regardless of object key order or transport formatting. Object
//! keys are sorted lexicographically at every nesting level; array element
//! order is semantically significant and preserved as-is.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanonicalError {
    /// The input contains values outside the JSON data model (e.g. a
    /// number that cannot be represented per RFC 8785).
    #[error("canonical serialization failed: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, CanonicalError>;

/// Serialize a JSON tree into its RFC 8785 canonical byte form.
pub fn canonicalize(value: &Value) -> Result<Vec<u8>> {
    serde_jcs::to_vec(value).map_err(|e| CanonicalError::Serialization(e.to_string()))
}

/// Canonical form as a UTF-8 string. Handy for the CLI and for debugging
/// signature mismatches.
pub fn canonicalize_to_string(value: &Value) -> Result<String> {
    serde_jcs::to_string(value).map_err(|e| CanonicalError::Serialization(e.to_string()))
}
