//! Certificate payload builders for vaccination / health-certificate
//! profiles.
//!
//! Each profile (DDCC, DVC, ICVP) owns a fixed QuestionnaireResponse
//! template and an extraction table mapping clinical resource fields onto
//! it. The shared mechanism is the template answer engine: a pure
//! tree-patching primitive that overwrites declared answer slots, removes
//! items whose value is absent, and prunes nested groups that end up
//! empty.

pub mod ddcc;
pub mod dvc;
pub mod icvp;
pub mod template;

mod clinical;
mod error;

pub use error::CertificateError;

pub type Result<T> = std::result::Result<T, CertificateError>;
