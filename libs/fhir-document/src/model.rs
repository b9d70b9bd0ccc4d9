//! FHIR Bundle model
//!
//! Version-agnostic model for Bundles that works across R4, R4B and R5.
//! Only the fields the gateway manipulates are typed; everything else is
//! carried opaquely through the flattened extension map so proxied
//! payloads round-trip untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// FHIR Bundle resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Resource type - always "Bundle"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    /// Logical id of this artifact
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Indicates the purpose of this bundle - how it was intended to be used
    #[serde(rename = "type")]
    pub bundle_type: BundleType,

    /// When the bundle was assembled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Entry in the bundle - will have a resource or information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Vec<BundleEntry>>,

    /// Digital Signature, kept opaque so foreign signature shapes survive
    /// a fetch-verify round trip unchanged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<Value>,

    /// Additional content beyond core fields (meta, links, version-specific fields)
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

fn default_resource_type() -> String {
    "Bundle".to_string()
}

/// Type of Bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    Document,
    Message,
    Transaction,
    #[serde(rename = "transaction-response")]
    TransactionResponse,
    Batch,
    #[serde(rename = "batch-response")]
    BatchResponse,
    History,
    Searchset,
    Collection,
}

/// Entry in the bundle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    /// Persistent (`ResourceType/id`) or transaction-scoped temporary
    /// (`urn:uuid:...`) address of the entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    /// A resource in this bundle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    /// The intended write for transaction/batch processing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<BundleEntryRequest>,

    /// Results of execution (transaction-response/batch-response)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<BundleEntryResponse>,

    /// Additional content beyond core fields
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

/// Request details for a Bundle entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntryRequest {
    /// HTTP verb for the entry (GET | POST | PUT | PATCH | DELETE)
    pub method: String,

    /// URL for HTTP equivalent of this entry
    pub url: String,

    /// Additional content beyond core fields
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

impl BundleEntryRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            extensions: HashMap::new(),
        }
    }
}

/// Response details for a Bundle entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntryResponse {
    /// Status response code (text)
    pub status: String,

    /// The location (if the operation returns a location)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// The Etag for the resource (if relevant)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Additional content beyond core fields
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

impl Bundle {
    pub fn new(bundle_type: BundleType) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            id: None,
            bundle_type,
            timestamp: None,
            entry: None,
            signature: None,
            extensions: HashMap::new(),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn is_document(&self) -> bool {
        matches!(self.bundle_type, BundleType::Document)
    }

    pub fn entries(&self) -> &[BundleEntry] {
        self.entry.as_deref().unwrap_or(&[])
    }

    pub fn add_entry(&mut self, entry: BundleEntry) {
        self.entry.get_or_insert_with(Vec::new).push(entry);
    }

    /// The document subject: the `subject` of the first (Composition-like)
    /// entry, falling back to a reference to the first Patient entry.
    pub fn subject(&self) -> Option<Value> {
        if let Some(subject) = self
            .entries()
            .first()
            .and_then(|e| e.resource.as_ref())
            .and_then(|r| r.get("subject"))
        {
            return Some(subject.clone());
        }
        let patient = self.find_resource("Patient")?;
        let id = patient.get("id").and_then(Value::as_str)?;
        Some(serde_json::json!({ "reference": format!("Patient/{id}") }))
    }

    /// First entry resource of the given type, if any.
    pub fn find_resource(&self, resource_type: &str) -> Option<&Value> {
        self.entries()
            .iter()
            .filter_map(|e| e.resource.as_ref())
            .find(|r| r.get("resourceType").and_then(Value::as_str) == Some(resource_type))
    }
}
