//! Gateway services

pub mod issuance;
pub mod reconciliation;
pub mod submission;
pub mod upstream;

pub use issuance::{CertificateIssuer, HttpCertificateIssuer};
pub use reconciliation::{
    ReconciliationJob, ReconciliationQueue, ReconciliationWorker, RetryPolicy,
};
pub use submission::SubmissionService;
pub use upstream::{DocumentStore, ReqwestDocumentStore, UpstreamResponse};
