mod support;

use axum::http::{Method, StatusCode};
use serde_json::json;
use support::{document_bundle, test_app};

#[tokio::test]
async fn document_post_is_signed_expanded_and_mirrored() -> anyhow::Result<()> {
    let app = test_app();

    let (status, body) = app
        .request(Method::POST, "/fhir/Bundle", Some(document_bundle()))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "transaction-response");

    let recorded = app.store.recorded();
    assert_eq!(recorded.len(), 1);
    let submitted = recorded[0].body.as_ref().unwrap();
    assert_eq!(submitted["type"], "transaction");

    let entries = submitted["entry"].as_array().unwrap();
    // 4 clinical entries + document copy + DocumentReference + List
    assert_eq!(entries.len(), 7);

    // The embedded document copy carries the signature.
    let copy = &entries[4]["resource"];
    assert_eq!(copy["type"], "document");
    assert_eq!(
        copy["signature"]["who"]["identifier"]["value"],
        "test-signer"
    );
    assert_eq!(entries[5]["resource"]["resourceType"], "DocumentReference");
    assert_eq!(entries[6]["resource"]["resourceType"], "List");
    Ok(())
}

#[tokio::test]
async fn non_document_bundle_is_signed_and_forwarded_unexpanded() -> anyhow::Result<()> {
    let app = test_app();
    let batch = json!({
        "resourceType": "Bundle",
        "type": "batch",
        "entry": []
    });

    let (status, _body) = app
        .request(Method::POST, "/fhir/Bundle", Some(batch))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let recorded = app.store.recorded();
    assert_eq!(recorded[0].path, "/Bundle");
    let forwarded = recorded[0].body.as_ref().unwrap();
    assert_eq!(forwarded["type"], "batch");
    assert!(forwarded.get("signature").is_some());
    Ok(())
}

#[tokio::test]
async fn non_bundle_body_passes_through_unsigned() -> anyhow::Result<()> {
    let app = test_app();
    let parameters = json!({"resourceType": "Parameters", "parameter": []});

    let (status, _body) = app
        .request(Method::POST, "/fhir/Bundle", Some(parameters))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let forwarded = app.store.recorded()[0].body.clone().unwrap();
    assert!(forwarded.get("signature").is_none());
    Ok(())
}

#[tokio::test]
async fn bundle_reads_pass_through_with_query() -> anyhow::Result<()> {
    let app = test_app();
    let (status, _body) = app
        .request(Method::GET, "/fhir/Bundle?_count=10", None)
        .await?;
    // Mock store has no search results; it answers 404 for unknown paths.
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.recorded()[0].path, "/Bundle?_count=10");
    Ok(())
}

#[tokio::test]
async fn proxy_forwards_arbitrary_paths() -> anyhow::Result<()> {
    let app = test_app();
    app.store
        .insert_resource("/Patient/p1", json!({"resourceType": "Patient", "id": "p1"}));

    let (status, body) = app.request(Method::GET, "/fhir/Patient/p1", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resourceType"], "Patient");

    let recorded = app.store.recorded();
    assert_eq!(recorded[0].method, Method::GET);
    assert_eq!(recorded[0].path, "/Patient/p1");
    Ok(())
}

#[tokio::test]
async fn upstream_rejection_is_mirrored_to_the_caller() -> anyhow::Result<()> {
    let app = test_app();
    app.store
        .set_transaction_status(StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .request(Method::POST, "/fhir/Bundle", Some(document_bundle()))
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["resourceType"], "OperationOutcome");
    Ok(())
}

#[tokio::test]
async fn document_without_subject_is_rejected() -> anyhow::Result<()> {
    let app = test_app();
    let document = json!({
        "resourceType": "Bundle",
        "type": "document",
        "entry": [{"resource": {"resourceType": "Composition"}}]
    });

    let (status, body) = app
        .request(Method::POST, "/fhir/Bundle", Some(document))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["resourceType"], "OperationOutcome");
    assert!(app.store.recorded().is_empty());
    Ok(())
}

#[tokio::test]
async fn submitted_document_verifies_until_tampered() -> anyhow::Result<()> {
    let app = test_app();

    let (status, _body) = app
        .request(Method::POST, "/fhir/Bundle", Some(document_bundle()))
        .await?;
    assert_eq!(status, StatusCode::OK);

    // The mock store now holds the signed document copy under the id the
    // transaction assigned.
    let submitted = app.store.recorded()[0].body.clone().unwrap();
    let document_id = submitted["id"].as_str().unwrap().to_string();
    let stored_path = format!("/Bundle/{document_id}");

    // Simulate server-assigned fields on the stored copy.
    let mut stored = app.store.resource(&stored_path).unwrap();
    stored["meta"] = json!({"versionId": "1", "lastUpdated": "2023-05-01T10:00:05Z"});
    app.store.insert_resource(&stored_path, stored.clone());

    let (status, body) = app
        .request(Method::GET, &format!("/verify/{document_id}"), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);

    // Tamper with one clinical field post-signature.
    stored["entry"][1]["resource"]["birthDate"] = json!("1990-01-01");
    app.store.insert_resource(&stored_path, stored);

    let (status, body) = app
        .request(Method::GET, &format!("/verify/{document_id}"), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], false);
    Ok(())
}

#[tokio::test]
async fn verify_mirrors_upstream_fetch_failure() -> anyhow::Result<()> {
    let app = test_app();
    let (status, body) = app.request(Method::GET, "/verify/nope", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["resourceType"], "OperationOutcome");
    Ok(())
}

#[tokio::test]
async fn health_and_keys_endpoints_respond() -> anyhow::Result<()> {
    let app = test_app();

    let (status, body) = app.request(Method::GET, "/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.request(Method::GET, "/keys/public", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["pem"]
        .as_str()
        .unwrap()
        .contains("BEGIN PUBLIC KEY"));
    assert_eq!(body["jwk"]["kty"], "EC");
    assert_eq!(body["jwk"]["crv"], "P-256");
    Ok(())
}
