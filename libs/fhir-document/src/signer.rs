//! Signature attach/verify orchestration.
//!
//! The signature covers the canonical byte form of the document as it
//! exists *before* the signature block and any server-assigned fields
//! (`id`, `meta`) are attached. Verification must reconstruct exactly
//! that "signable view", or it fails even for untampered documents.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use siegel_signature::{KeyRegistry, SignatureService};

use crate::{DocumentError, Result};

/// ASTM E1762-95 signature purpose coding carried on every signature.
pub const SIGNATURE_PURPOSE_SYSTEM: &str = "urn:iso-astm:E1762-95:2013";
/// "Verification Signature"
pub const SIGNATURE_PURPOSE_CODE: &str = "1.2.840.10065.1.12.1.5";

/// Identity recorded in the signature's `who.identifier`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignerIdentity {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// Wire shape of the FHIR signature block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignatureBlock {
    #[serde(rename = "type")]
    pub purpose: Vec<Value>,
    pub when: String,
    pub who: Value,
    pub data: String,
}

impl SignatureBlock {
    fn new(signer: &SignerIdentity, data: String) -> Self {
        Self {
            purpose: vec![json!({
                "system": SIGNATURE_PURPOSE_SYSTEM,
                "code": SIGNATURE_PURPOSE_CODE,
            })],
            when: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            who: json!({ "identifier": signer }),
            data,
        }
    }

    /// The signer identity value, when the block carries one.
    pub fn signer(&self) -> Option<&str> {
        self.who
            .get("identifier")
            .and_then(|i| i.get("value"))
            .and_then(Value::as_str)
    }
}

/// Sign a body and return a copy carrying the signature block.
///
/// No-op for anything that is neither a Bundle resource nor a
/// `document`-typed body; such payloads pass through the gateway
/// unsigned. The signed bytes are the canonical form of the signable
/// view, so a document that already carries an `id` verifies the same
/// as one the gateway assigns an id to later.
pub fn attach_signature(
    body: Value,
    service: &SignatureService,
    signer: &SignerIdentity,
) -> Result<Value> {
    let is_bundle = body.get("resourceType").and_then(Value::as_str) == Some("Bundle");
    let is_document = body.get("type").and_then(Value::as_str) == Some("document");
    if !is_bundle && !is_document {
        return Ok(body);
    }

    let canonical = siegel_canonical::canonicalize(&signable_view(&body))?;
    let data = STANDARD.encode(service.sign(&canonical));
    let block = SignatureBlock::new(signer, data);

    let mut signed = body;
    if let Some(obj) = signed.as_object_mut() {
        obj.insert("signature".to_string(), serde_json::to_value(&block)?);
    }
    Ok(signed)
}

/// Reconstruct the document as it existed at signing time by stripping
/// the fields a storage server assigns afterwards: top-level `id`,
/// `signature` and `meta`, and each entry resource's `meta`.
pub fn signable_view(bundle: &Value) -> Value {
    let mut view = bundle.clone();
    if let Some(obj) = view.as_object_mut() {
        obj.remove("id");
        obj.remove("signature");
        obj.remove("meta");
        if let Some(Value::Array(entries)) = obj.get_mut("entry") {
            for entry in entries {
                if let Some(resource) = entry.get_mut("resource").and_then(Value::as_object_mut) {
                    resource.remove("meta");
                }
            }
        }
    }
    view
}

/// Verify a previously signed (and possibly stored) bundle.
///
/// The verifying key is selected through the registry by the signer
/// identity recorded in the signature block. A mismatching signature is
/// a normal `false`; only undecodable signature material or an
/// unresolvable key errors.
pub fn verify_signature(bundle: &Value, registry: &dyn KeyRegistry) -> Result<bool> {
    let Some(signature) = bundle.get("signature") else {
        return Ok(false);
    };
    let block: SignatureBlock = serde_json::from_value(signature.clone())
        .map_err(|e| DocumentError::MalformedSignature(e.to_string()))?;
    let data = STANDARD
        .decode(&block.data)
        .map_err(|e| DocumentError::MalformedSignature(e.to_string()))?;

    let signer = block.signer().unwrap_or_default();
    let key = registry.verifying_key(signer).ok_or_else(|| {
        DocumentError::MalformedSignature(format!("no verifying key for signer '{signer}'"))
    })?;

    let canonical = siegel_canonical::canonicalize(&signable_view(bundle))?;
    Ok(SignatureService::verify(&canonical, &data, &key)?)
}
