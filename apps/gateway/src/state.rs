//! Shared application state

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use siegel_document::{SignerIdentity, TransactionContext};
use siegel_signature::{SignatureService, StaticKeyRegistry};

use crate::config::Config;
use crate::services::{
    CertificateIssuer, DocumentStore, HttpCertificateIssuer, ReconciliationQueue,
    ReconciliationWorker, ReqwestDocumentStore, RetryPolicy, SubmissionService,
};
use crate::{Error, Result};

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub signature: Arc<SignatureService>,
    pub key_registry: Arc<StaticKeyRegistry>,
    pub store: Arc<dyn DocumentStore>,
    pub issuer: Option<Arc<dyn CertificateIssuer>>,
    pub submission: Arc<SubmissionService>,
}

impl AppState {
    /// Initialize the application state with real collaborators.
    pub fn new(config: Config) -> Result<(Self, ReconciliationWorker)> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_seconds))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;

        let store: Arc<dyn DocumentStore> = Arc::new(ReqwestDocumentStore::new(
            client.clone(),
            config.upstream.fhir_url.clone(),
        ));
        let issuer = config.certificates.issuance_url.clone().map(|url| {
            Arc::new(HttpCertificateIssuer::new(client, url)) as Arc<dyn CertificateIssuer>
        });

        Self::with_collaborators(config, store, issuer)
    }

    /// Assemble the state around the given collaborators. Integration
    /// tests use this with in-memory doubles.
    pub fn with_collaborators(
        config: Config,
        store: Arc<dyn DocumentStore>,
        issuer: Option<Arc<dyn CertificateIssuer>>,
    ) -> Result<(Self, ReconciliationWorker)> {
        let signature = Arc::new(SignatureService::load_or_generate(
            config.signing.key_file.as_deref().map(Path::new),
        )?);

        let mut key_registry = StaticKeyRegistry::new(*signature.verifying_key());
        for known in &config.signing.known_keys {
            let pem = std::fs::read_to_string(&known.public_key_file).map_err(|e| {
                Error::KeyMaterial(format!(
                    "failed to read public key for signer '{}': {e}",
                    known.signer
                ))
            })?;
            key_registry.insert(&known.signer, SignatureService::public_key_from_pem(&pem)?);
        }

        let (reconciliation, worker) = ReconciliationQueue::spawn(
            store.clone(),
            RetryPolicy {
                max_attempts: config.reconciliation.max_attempts,
                retry_delay: Duration::from_secs(config.reconciliation.retry_delay_seconds),
            },
            config.reconciliation.queue_capacity,
        );

        let submission = Arc::new(SubmissionService::new(
            store.clone(),
            signature.clone(),
            SignerIdentity {
                value: config.signing.signer_value.clone(),
                system: config.signing.signer_system.clone(),
            },
            TransactionContext {
                base_url: config.upstream.fhir_url.clone(),
                source_system: config.upstream.source_system.clone(),
            },
            reconciliation,
        ));

        Ok((
            Self {
                config: Arc::new(config),
                signature,
                key_registry: Arc::new(key_registry),
                store,
                issuer,
                submission,
            },
            worker,
        ))
    }
}
