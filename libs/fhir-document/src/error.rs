use siegel_canonical::CanonicalError;
use siegel_signature::KeyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    #[error(transparent)]
    Key(#[from] KeyError),

    /// The document is structurally unusable (e.g. no recognizable
    /// subject) and cannot be expanded into a transaction.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A stored signature block that cannot be decoded (wrong shape,
    /// undecodable base64). A merely mismatching signature is not an
    /// error; verification reports it as `false`.
    #[error("malformed signature block: {0}")]
    MalformedSignature(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
