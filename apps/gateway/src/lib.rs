//! Siegel — FHIR document signing and submission gateway.
//!
//! Sits between clients and a FHIR document repository: signs clinical
//! document bundles, expands them into registry-complete transactions,
//! reconciles store-assigned addresses back into the registry records,
//! verifies stored signatures, and derives certificate payloads for
//! external issuance services.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod services;
pub mod state;

pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;
