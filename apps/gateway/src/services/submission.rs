//! Bundle submission orchestration: sign, expand, submit, reconcile.

use std::sync::Arc;

use axum::http::Method;
use serde_json::Value;
use siegel_document::{
    attach_signature, build_transaction, correlate, SignerIdentity, TransactionContext,
};
use siegel_signature::SignatureService;

use super::reconciliation::{ReconciliationJob, ReconciliationQueue};
use super::upstream::{DocumentStore, UpstreamResponse};
use crate::{Error, Result};

pub struct SubmissionService {
    store: Arc<dyn DocumentStore>,
    signature: Arc<SignatureService>,
    signer: SignerIdentity,
    transaction_ctx: TransactionContext,
    reconciliation: ReconciliationQueue,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        signature: Arc<SignatureService>,
        signer: SignerIdentity,
        transaction_ctx: TransactionContext,
        reconciliation: ReconciliationQueue,
    ) -> Self {
        Self {
            store,
            signature,
            signer,
            transaction_ctx,
            reconciliation,
        }
    }

    /// Handle a write against the Bundle endpoint.
    ///
    /// Every Bundle (or `document`-typed body) is signed. A document
    /// submitted for creation is additionally expanded into a
    /// transaction so the store persists each contained resource plus
    /// the registry records. Updates pass through signed but unexpanded.
    pub async fn submit_bundle(&self, method: Method, body: Value) -> Result<UpstreamResponse> {
        let body = attach_signature(body, &self.signature, &self.signer)?;

        let is_document = body.get("type").and_then(Value::as_str) == Some("document");
        if method == Method::POST && is_document {
            return self.submit_document(body).await;
        }

        let path = if method == Method::PUT {
            let id = body.get("id").and_then(Value::as_str).ok_or_else(|| {
                Error::InvalidRequest("Bundle update requires an id".to_string())
            })?;
            format!("/Bundle/{id}")
        } else {
            "/Bundle".to_string()
        };
        self.store.forward(method, &path, Some(body)).await
    }

    async fn submit_document(&self, document: Value) -> Result<UpstreamResponse> {
        let plan = build_transaction(document, &self.transaction_ctx)?;
        tracing::info!(document_id = %plan.document_id, "Submitting document as transaction");

        let response = self.store.submit_transaction(&plan.transaction).await?;
        if response.is_success() {
            self.schedule_reconciliation(&plan, &response.body);
        } else {
            tracing::warn!(
                document_id = %plan.document_id,
                status = %response.status,
                "Store rejected document transaction"
            );
        }
        Ok(response)
    }

    /// Compare the store-assigned addresses against the plan and queue
    /// the follow-up write when the registry record points at a stale
    /// address. Skipped (and logged) when the response cannot be
    /// correlated — the primary response has already succeeded.
    fn schedule_reconciliation(&self, plan: &siegel_document::TransactionPlan, body: &Value) {
        let outcome = correlate(plan, body);
        let (Some(document), Some(document_reference)) =
            (outcome.document, outcome.document_reference)
        else {
            tracing::warn!(
                document_id = %plan.document_id,
                "Transaction response lacks correlatable entries, skipping reconciliation"
            );
            return;
        };

        if document.id == plan.document_id {
            tracing::debug!(
                document_id = %plan.document_id,
                "Store kept the assigned document id, registry record is consistent"
            );
            return;
        }

        tracing::info!(
            planned = %plan.document_id,
            assigned = %document.id,
            "Store re-addressed the document, queueing registry reconciliation"
        );
        self.reconciliation
            .enqueue(ReconciliationJob::PatchDocumentReference {
                document_reference: document_reference.relative(),
                document_id: document.id.clone(),
                attachment_url: format!(
                    "{}/Bundle/{}",
                    self.transaction_ctx.base_url, document.id
                ),
            });
    }
}
