//! ECDSA P-256 signing for canonical document bytes.
//!
//! One key pair is loaded (or generated) at process start and stays
//! immutable for the process lifetime; it is safe to share across
//! concurrent requests without synchronization. Verification against
//! foreign signers goes through a [`KeyRegistry`] keyed by the signer
//! identity recorded in the document's signature block.

mod registry;
mod service;

pub use registry::{KeyRegistry, StaticKeyRegistry};
pub use service::{KeyError, SignatureService};

pub use p256::ecdsa::VerifyingKey;
