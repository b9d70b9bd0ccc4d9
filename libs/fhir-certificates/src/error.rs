use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertificateError {
    /// A field the profile's extraction table marks as required is
    /// missing from the clinical input.
    #[error("incomplete clinical data: missing {field}")]
    IncompleteClinicalData { field: String },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CertificateError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::IncompleteClinicalData {
            field: field.into(),
        }
    }
}
