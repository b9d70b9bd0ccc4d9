//! Transaction-response correlation.
//!
//! After the store accepts a transaction it returns per-entry
//! `response.location` values carrying the addresses it assigned. The
//! synthesized registry entries are recovered by matching on the echoed
//! `fullUrl` temporary references the builder itself generated, with the
//! resource type parsed from the location as a fallback — entry position
//! is never consulted, so stores that reorder results still correlate.

use serde_json::Value;

use crate::TransactionPlan;

/// A persistent `ResourceType/id` address parsed from a location string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocation {
    pub resource_type: String,
    pub id: String,
}

impl ResourceLocation {
    pub fn relative(&self) -> String {
        format!("{}/{}", self.resource_type, self.id)
    }
}

/// Parse `[base/]ResourceType/id[/_history/version]` into its identity.
pub fn parse_location(location: &str) -> Option<ResourceLocation> {
    let parts: Vec<&str> = location.split('/').filter(|s| !s.is_empty()).collect();
    let end = parts
        .iter()
        .position(|p| *p == "_history")
        .unwrap_or(parts.len());
    if end < 2 {
        return None;
    }
    let resource_type = parts[end - 2];
    if !resource_type.starts_with(|c: char| c.is_ascii_uppercase()) {
        return None;
    }
    Some(ResourceLocation {
        resource_type: resource_type.to_string(),
        id: parts[end - 1].to_string(),
    })
}

/// Store-assigned addresses recovered from a transaction response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub document: Option<ResourceLocation>,
    pub document_reference: Option<ResourceLocation>,
    pub patient: Option<ResourceLocation>,
}

impl SubmissionOutcome {
    /// Whether the response carried enough addresses to reconcile the
    /// registry record with the stored document.
    pub fn is_complete(&self) -> bool {
        self.document.is_some() && self.document_reference.is_some()
    }
}

/// Correlate a store response with the transaction that produced it.
pub fn correlate(plan: &TransactionPlan, response: &Value) -> SubmissionOutcome {
    let entries = response
        .get("entry")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut outcome = SubmissionOutcome::default();
    for entry in entries {
        let location = entry
            .get("response")
            .and_then(|r| r.get("location"))
            .and_then(Value::as_str)
            .and_then(parse_location);
        let Some(location) = location else { continue };
        let full_url = entry.get("fullUrl").and_then(Value::as_str);

        if full_url == Some(plan.document_reference_urn.as_str()) {
            outcome.document_reference = Some(location);
            continue;
        }
        match location.resource_type.as_str() {
            // Each of these types occurs exactly once in a synthesized
            // transaction, so type-based matching stays unambiguous when
            // the store does not echo fullUrl values.
            "Bundle" if outcome.document.is_none() => outcome.document = Some(location),
            "DocumentReference" if outcome.document_reference.is_none() => {
                outcome.document_reference = Some(location)
            }
            "Patient" if outcome.patient.is_none() => outcome.patient = Some(location),
            _ => {}
        }
    }
    outcome
}
