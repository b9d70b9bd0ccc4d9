//! FHIR document plumbing for the signing gateway.
//!
//! A version-agnostic Bundle model, the signature attach/verify
//! orchestration over canonical bytes, and the expansion of a `document`
//! bundle into the registry-complete transaction shape (document copy +
//! DocumentReference + submission-set List) required by cross-border
//! document exchange profiles.

mod correlate;
mod error;
mod model;
mod signer;
mod transaction;

pub use correlate::{correlate, parse_location, ResourceLocation, SubmissionOutcome};
pub use error::DocumentError;
pub use model::{Bundle, BundleEntry, BundleEntryRequest, BundleEntryResponse, BundleType};
pub use signer::{
    attach_signature, signable_view, verify_signature, SignatureBlock, SignerIdentity,
    SIGNATURE_PURPOSE_CODE, SIGNATURE_PURPOSE_SYSTEM,
};
pub use transaction::{build_transaction, TransactionContext, TransactionPlan};

pub type Result<T> = std::result::Result<T, DocumentError>;
