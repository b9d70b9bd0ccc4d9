//! Reconciliation follow-up writes.
//!
//! After a transaction is accepted, the store may have assigned the
//! document an address different from the one the registry record points
//! at. Reconciliation rewrites the DocumentReference so its attachment
//! URL and identifier match the stored document. The primary response has
//! already been sent by then, so these writes run on a bounded queue with
//! explicit, logged retries — observed, never blocking, never rolled
//! back into the caller's request.

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::upstream::DocumentStore;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationJob {
    /// Point the registry record at the document's store-assigned
    /// address. Idempotent: re-applying writes the same fields.
    PatchDocumentReference {
        /// Relative path of the stored record, e.g. `DocumentReference/dr-9`.
        document_reference: String,
        /// Store-assigned document id.
        document_id: String,
        /// Attachment URL the record must carry.
        attachment_url: String,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

/// Sending half handed to request-scoped services. Cloneable; dropping
/// all clones shuts the worker down once the queue drains.
#[derive(Clone)]
pub struct ReconciliationQueue {
    tx: mpsc::Sender<ReconciliationJob>,
}

/// Join handle for the worker task, awaited during shutdown.
pub struct ReconciliationWorker {
    handle: JoinHandle<()>,
}

impl ReconciliationWorker {
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::error!("Reconciliation worker task join error: {}", e);
        }
    }
}

impl ReconciliationQueue {
    /// Spawn the worker task and return the queue handle plus the worker.
    pub fn spawn(
        store: Arc<dyn DocumentStore>,
        policy: RetryPolicy,
        capacity: usize,
    ) -> (Self, ReconciliationWorker) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(run_worker(store, rx, policy));
        (Self { tx }, ReconciliationWorker { handle })
    }

    /// Enqueue without blocking the primary response. A full queue drops
    /// the job with a warning; the registry record stays patchable by a
    /// later resubmission.
    pub fn enqueue(&self, job: ReconciliationJob) {
        if let Err(e) = self.tx.try_send(job) {
            tracing::warn!("Reconciliation queue full, dropping follow-up write: {}", e);
        }
    }
}

async fn run_worker(
    store: Arc<dyn DocumentStore>,
    mut rx: mpsc::Receiver<ReconciliationJob>,
    policy: RetryPolicy,
) {
    while let Some(job) = rx.recv().await {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match apply(store.as_ref(), &job).await {
                Ok(()) => {
                    tracing::info!(?job, attempt, "Reconciliation write applied");
                    break;
                }
                Err(e) if attempt < policy.max_attempts => {
                    tracing::warn!(?job, attempt, error = %e, "Reconciliation write failed, retrying");
                    tokio::time::sleep(policy.retry_delay).await;
                }
                Err(e) => {
                    tracing::error!(?job, attempt, error = %e, "Reconciliation write failed, giving up");
                    break;
                }
            }
        }
    }
    tracing::debug!("Reconciliation worker stopped");
}

async fn apply(store: &dyn DocumentStore, job: &ReconciliationJob) -> Result<()> {
    match job {
        ReconciliationJob::PatchDocumentReference {
            document_reference,
            document_id,
            attachment_url,
        } => {
            let path = format!("/{document_reference}");
            let fetched = store.fetch(&path).await?;
            if !fetched.is_success() {
                return Err(Error::UpstreamUnreachable(format!(
                    "fetching {document_reference} returned {}",
                    fetched.status
                )));
            }
            let patched =
                patched_document_reference(fetched.body, document_id, attachment_url);
            let updated = store.forward(Method::PUT, &path, Some(patched)).await?;
            if !updated.is_success() {
                return Err(Error::UpstreamUnreachable(format!(
                    "updating {document_reference} returned {}",
                    updated.status
                )));
            }
            Ok(())
        }
    }
}

/// Rewrite the registry record's identifier and attachment URL to the
/// store-assigned document address. Pure; returns the new tree.
fn patched_document_reference(resource: Value, document_id: &str, attachment_url: &str) -> Value {
    let mut patched = resource;
    if let Some(identifiers) = patched.get_mut("identifier").and_then(Value::as_array_mut) {
        for identifier in identifiers {
            identifier["value"] = json!(document_id);
        }
    }
    if let Some(master) = patched.get_mut("masterIdentifier") {
        master["value"] = json!(document_id);
    }
    if let Some(content) = patched
        .get_mut("content")
        .and_then(Value::as_array_mut)
        .and_then(|c| c.first_mut())
    {
        content["attachment"]["url"] = json!(attachment_url);
    }
    patched
}
