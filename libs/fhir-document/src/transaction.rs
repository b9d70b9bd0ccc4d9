//! Document → transaction expansion.
//!
//! A `document` bundle submitted for creation is rewritten into a
//! transaction that (a) writes every contained resource, (b) writes the
//! document itself, and (c) registers it with the document registry via a
//! synthesized DocumentReference and submission-set List, cross-linked
//! through transaction-scoped `urn:uuid` temporary references.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    Bundle, BundleEntry, BundleEntryRequest, BundleType, DocumentError, Result,
};

const IPS_BUNDLE_PROFILE: &str = "http://hl7.org/fhir/uv/ips/StructureDefinition/Bundle-uv-ips";
const MHD_DOCUMENT_REFERENCE_SYSTEM: &str =
    "https://profiles.ihe.net/ITI/MHD/StructureDefinition/IHE.MHD.Comprehensive.DocumentReference";
const MHD_SUBMISSION_SET_SYSTEM: &str =
    "https://profiles.ihe.net/ITI/MHD/StructureDefinition/IHE.MHD.Minimal.SubmissionSet";
const MHD_SOURCE_ID_EXTENSION: &str =
    "http://profiles.ihe.net/ITI/MHD/StructureDefinition/ihe-sourceId";
const MHD_LIST_TYPES_SYSTEM: &str = "http://profiles.ihe.net/ITI/MHD/CodeSystem/MHDlistTypes";

/// Deployment-level inputs to the expansion.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    /// External base URL of the document store, used for the
    /// DocumentReference content attachment.
    pub base_url: String,
    /// Originating-system identifier recorded on the submission set.
    pub source_system: String,
}

/// The transaction bundle plus the correlation handles reconciliation
/// needs after the store assigns real addresses.
#[derive(Debug, Clone)]
pub struct TransactionPlan {
    pub transaction: Value,
    /// The document id assigned (or kept) during expansion.
    pub document_id: String,
    /// Temporary address of the synthesized DocumentReference.
    pub document_reference_urn: String,
    /// Temporary address of the synthesized submission-set List.
    pub submission_set_urn: String,
}

/// Expand a signed `document` bundle into a transaction.
///
/// Only meaningful for create submissions; callers gate on the incoming
/// method. The input is consumed and a new tree is returned.
pub fn build_transaction(document: Value, ctx: &TransactionContext) -> Result<TransactionPlan> {
    let mut bundle = Bundle::from_value(&document)?;
    if !bundle.is_document() {
        return Err(DocumentError::MalformedDocument(
            "transaction expansion requires a document-typed bundle".to_string(),
        ));
    }

    let subject = bundle.subject().ok_or_else(|| {
        DocumentError::MalformedDocument(
            "document has no subject and no Patient-bearing entry".to_string(),
        )
    })?;

    let document_id = match bundle.id.clone() {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4().to_string();
            bundle.id = Some(id.clone());
            id
        }
    };
    let timestamp = bundle.timestamp.clone();

    // Address every original entry: update when the resource already has
    // an id, create otherwise (the store assigns the address).
    if let Some(entries) = bundle.entry.as_mut() {
        for entry in entries.iter_mut() {
            let Some(resource) = entry.resource.as_ref() else {
                continue;
            };
            let resource_type = resource
                .get("resourceType")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    DocumentError::MalformedDocument(
                        "document entry resource is missing resourceType".to_string(),
                    )
                })?;
            entry.request = Some(match resource.get("id").and_then(Value::as_str) {
                Some(id) => BundleEntryRequest::new("PUT", format!("{resource_type}/{id}")),
                None => BundleEntryRequest::new("POST", resource_type),
            });
        }
    }

    // Full copy of the document itself (signed, id assigned), written to
    // its own address. Copied before the registry entries are appended so
    // the stored document matches what was signed.
    let document_copy = {
        let mut copy = bundle.clone();
        for entry in copy.entry.iter_mut().flatten() {
            entry.request = None;
        }
        copy.to_value()?
    };
    bundle.add_entry(BundleEntry {
        resource: Some(document_copy),
        request: Some(BundleEntryRequest::new(
            "PUT",
            format!("Bundle/{document_id}"),
        )),
        ..Default::default()
    });

    let document_reference_urn = format!("urn:uuid:{}", Uuid::new_v4());
    bundle.add_entry(document_reference_entry(
        &document_reference_urn,
        &document_id,
        &subject,
        timestamp.as_deref(),
        &ctx.base_url,
    ));

    let submission_set_id = Uuid::new_v4().to_string();
    let submission_set_urn = format!("urn:uuid:{submission_set_id}");
    bundle.add_entry(submission_set_entry(
        &submission_set_urn,
        &submission_set_id,
        &document_reference_urn,
        &subject,
        timestamp.as_deref(),
        &ctx.source_system,
    ));

    bundle.bundle_type = BundleType::Transaction;

    Ok(TransactionPlan {
        transaction: bundle.to_value()?,
        document_id,
        document_reference_urn,
        submission_set_urn,
    })
}

/// Registry record describing where the document artifact is retrievable
/// and who it is about.
fn document_reference_entry(
    urn: &str,
    document_id: &str,
    subject: &Value,
    timestamp: Option<&str>,
    base_url: &str,
) -> BundleEntry {
    let identifier = json!({
        "system": MHD_DOCUMENT_REFERENCE_SYSTEM,
        "value": document_id,
    });
    let mut resource = json!({
        "resourceType": "DocumentReference",
        "meta": { "profile": [IPS_BUNDLE_PROFILE] },
        "status": "current",
        "identifier": [identifier],
        "masterIdentifier": identifier,
        "subject": subject,
        "content": [{
            "attachment": {
                "contentType": "application/fhir+json",
                "url": format!("{base_url}/Bundle/{document_id}"),
            }
        }]
    });
    if let Some(timestamp) = timestamp {
        resource["date"] = json!(timestamp);
    }

    BundleEntry {
        full_url: Some(urn.to_string()),
        resource: Some(resource),
        request: Some(BundleEntryRequest::new("POST", "DocumentReference")),
        ..Default::default()
    }
}

/// Registry record grouping the DocumentReference into one submission
/// event, pointing at it through its temporary address.
fn submission_set_entry(
    urn: &str,
    submission_set_id: &str,
    document_reference_urn: &str,
    subject: &Value,
    timestamp: Option<&str>,
    source_system: &str,
) -> BundleEntry {
    let mut resource = json!({
        "resourceType": "List",
        "extension": [{
            "url": MHD_SOURCE_ID_EXTENSION,
            "valueIdentifier": {
                "system": "origin",
                "value": source_system,
            }
        }],
        "identifier": [
            {
                "use": "usual",
                "system": MHD_SUBMISSION_SET_SYSTEM,
                "value": submission_set_id,
            },
            {
                "use": "official",
                "system": MHD_SUBMISSION_SET_SYSTEM,
                "value": submission_set_id,
            }
        ],
        "subject": subject,
        "status": "current",
        "mode": "working",
        "code": {
            "coding": [{
                "system": MHD_LIST_TYPES_SYSTEM,
                "code": "submissionset",
            }]
        },
        "entry": [{
            "item": { "reference": document_reference_urn }
        }]
    });
    if let Some(timestamp) = timestamp {
        resource["date"] = json!(timestamp);
    }

    BundleEntry {
        full_url: Some(urn.to_string()),
        resource: Some(resource),
        request: Some(BundleEntryRequest::new("POST", "List")),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ctx() -> TransactionContext {
        TransactionContext {
            base_url: "http://store.example.org/fhir".to_string(),
            source_system: "siegel-gateway".to_string(),
        }
    }

    fn document() -> Value {
        json!({
            "resourceType": "Bundle",
            "type": "document",
            "timestamp": "2023-05-01T10:00:00Z",
            "entry": [
                {"resource": {"resourceType": "Composition", "subject": {"reference": "Patient/p1"}}},
                {"resource": {"resourceType": "Patient", "id": "p1"}},
                {"resource": {"resourceType": "Immunization"}}
            ]
        })
    }

    #[test]
    fn expansion_produces_transaction_with_three_synthesized_entries() {
        let plan = build_transaction(document(), &ctx()).unwrap();
        let transaction = &plan.transaction;
        assert_eq!(transaction["type"], "transaction");

        let entries = transaction["entry"].as_array().unwrap();
        // 3 originals + document copy + DocumentReference + submission set
        assert_eq!(entries.len(), 6);
        assert_eq!(
            entries[3]["resource"]["resourceType"], "Bundle",
            "document copy follows the original entries"
        );
        assert_eq!(entries[4]["resource"]["resourceType"], "DocumentReference");
        assert_eq!(entries[5]["resource"]["resourceType"], "List");
    }

    #[test]
    fn write_targets_are_create_or_update_per_resource_id() {
        let plan = build_transaction(document(), &ctx()).unwrap();
        let entries = plan.transaction["entry"].as_array().unwrap();

        // Composition carries no id: create.
        assert_eq!(entries[0]["request"]["method"], "POST");
        assert_eq!(entries[0]["request"]["url"], "Composition");
        // Patient carries an id: update at its persistent address.
        assert_eq!(entries[1]["request"]["method"], "PUT");
        assert_eq!(entries[1]["request"]["url"], "Patient/p1");
        // The document copy writes to its own address.
        assert_eq!(entries[3]["request"]["method"], "PUT");
        assert_eq!(
            entries[3]["request"]["url"],
            format!("Bundle/{}", plan.document_id)
        );
    }

    #[test]
    fn missing_document_id_is_assigned() {
        let plan = build_transaction(document(), &ctx()).unwrap();
        assert!(!plan.document_id.is_empty());
        assert_eq!(plan.transaction["id"], plan.document_id.as_str());
    }

    #[test]
    fn existing_document_id_is_kept() {
        let mut doc = document();
        doc["id"] = json!("doc-42");
        let plan = build_transaction(doc, &ctx()).unwrap();
        assert_eq!(plan.document_id, "doc-42");
    }

    #[test]
    fn document_reference_registers_the_document() {
        let plan = build_transaction(document(), &ctx()).unwrap();
        let doc_ref = &plan.transaction["entry"][4];

        assert_eq!(doc_ref["fullUrl"], plan.document_reference_urn.as_str());
        let resource = &doc_ref["resource"];
        assert_eq!(resource["status"], "current");
        assert_eq!(resource["identifier"][0]["value"], plan.document_id.as_str());
        assert_eq!(resource["masterIdentifier"], resource["identifier"][0]);
        assert_eq!(resource["subject"]["reference"], "Patient/p1");
        assert_eq!(resource["date"], "2023-05-01T10:00:00Z");
        assert_eq!(
            resource["content"][0]["attachment"]["url"],
            format!("http://store.example.org/fhir/Bundle/{}", plan.document_id)
        );
    }

    #[test]
    fn submission_set_links_the_document_reference() {
        let plan = build_transaction(document(), &ctx()).unwrap();
        let list = &plan.transaction["entry"][5]["resource"];

        assert_eq!(list["resourceType"], "List");
        assert_eq!(list["mode"], "working");
        assert_eq!(list["code"]["coding"][0]["code"], "submissionset");
        assert_eq!(
            list["extension"][0]["valueIdentifier"]["value"],
            "siegel-gateway"
        );
        assert_eq!(
            list["entry"][0]["item"]["reference"],
            plan.document_reference_urn.as_str()
        );
    }

    #[test]
    fn temporary_references_are_unique_within_the_transaction() {
        let plan = build_transaction(document(), &ctx()).unwrap();
        let entries = plan.transaction["entry"].as_array().unwrap();
        let urns: Vec<&str> = entries
            .iter()
            .filter_map(|e| e["fullUrl"].as_str())
            .filter(|u| u.starts_with("urn:uuid:"))
            .collect();
        let unique: HashSet<&str> = urns.iter().copied().collect();
        assert_eq!(urns.len(), unique.len());
        assert_ne!(plan.document_reference_urn, plan.submission_set_urn);
    }

    #[test]
    fn temporary_references_differ_across_transactions() {
        let first = build_transaction(document(), &ctx()).unwrap();
        let second = build_transaction(document(), &ctx()).unwrap();
        assert_ne!(
            first.document_reference_urn,
            second.document_reference_urn
        );
        assert_ne!(first.submission_set_urn, second.submission_set_urn);
    }

    #[test]
    fn document_copy_keeps_signature_and_drops_entry_requests() {
        let mut doc = document();
        doc["signature"] = json!({"data": "c2lnbmF0dXJl"});
        let plan = build_transaction(doc, &ctx()).unwrap();

        let copy = &plan.transaction["entry"][3]["resource"];
        assert_eq!(copy["type"], "document");
        assert_eq!(copy["signature"]["data"], "c2lnbmF0dXJl");
        for entry in copy["entry"].as_array().unwrap() {
            assert!(entry.get("request").is_none());
        }
    }

    #[test]
    fn document_without_subject_is_rejected() {
        let doc = json!({
            "resourceType": "Bundle",
            "type": "document",
            "entry": [
                {"resource": {"resourceType": "Composition"}},
                {"resource": {"resourceType": "Immunization"}}
            ]
        });
        let err = build_transaction(doc, &ctx()).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedDocument(_)));
    }

    #[test]
    fn non_document_bundle_is_rejected() {
        let batch = json!({"resourceType": "Bundle", "type": "batch", "entry": []});
        assert!(matches!(
            build_transaction(batch, &ctx()),
            Err(DocumentError::MalformedDocument(_))
        ));
    }
}
