//! Key pair lifecycle and sign/verify primitives.

use std::path::{Path, PathBuf};

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, EncodePublicKey, LineEnding};
use p256::SecretKey;
use rand_core::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unparsable key material: {0}")]
    Malformed(String),
    #[error("malformed signature material: {0}")]
    MalformedSignature(String),
}

pub type Result<T> = std::result::Result<T, KeyError>;

/// Holds the process-wide ECDSA P-256 key pair.
///
/// Signatures are emitted DER-encoded (the encoding produced by the usual
/// platform crypto stacks), SHA-256 digest.
#[derive(Clone)]
pub struct SignatureService {
    secret: SecretKey,
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl SignatureService {
    /// Load the key pair from a PKCS#8 PEM file, failing fast when the
    /// file exists but cannot be parsed.
    pub fn from_key_file(path: &Path) -> Result<Self> {
        let pem = std::fs::read_to_string(path).map_err(|source| KeyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pkcs8_pem(&pem)
    }

    /// Parse a key pair from PKCS#8 PEM text.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let secret =
            SecretKey::from_pkcs8_pem(pem).map_err(|e| KeyError::Malformed(e.to_string()))?;
        Ok(Self::from_secret(secret))
    }

    /// Generate an ephemeral key pair. Documents signed with it cannot be
    /// verified after a restart, so this is development-only behavior.
    pub fn ephemeral() -> Self {
        Self::from_secret(SecretKey::random(&mut OsRng))
    }

    /// Key loading policy: use the configured key file when it exists
    /// (unparsable files are a hard error), otherwise fall back to an
    /// ephemeral pair for the process lifetime.
    pub fn load_or_generate(key_file: Option<&Path>) -> Result<Self> {
        match key_file {
            Some(path) if path.exists() => {
                let service = Self::from_key_file(path)?;
                tracing::info!(key_file = %path.display(), "Loaded signing key");
                Ok(service)
            }
            _ => {
                tracing::warn!(
                    "No signing key file configured or present; using an ephemeral key pair. \
                     Signatures will not be verifiable after restart."
                );
                Ok(Self::ephemeral())
            }
        }
    }

    fn from_secret(secret: SecretKey) -> Self {
        let signing_key = SigningKey::from(&secret);
        let verifying_key = *signing_key.verifying_key();
        Self {
            secret,
            signing_key,
            verifying_key,
        }
    }

    /// Sign canonical bytes, returning the DER-encoded ECDSA signature.
    pub fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(bytes);
        signature.to_der().as_bytes().to_vec()
    }

    /// Verify a DER-encoded signature over `bytes` with the given key.
    ///
    /// A mismatch is a normal `false` result; only malformed signature
    /// material is an error.
    pub fn verify(bytes: &[u8], signature: &[u8], key: &VerifyingKey) -> Result<bool> {
        let signature = Signature::from_der(signature)
            .or_else(|_| Signature::from_slice(signature))
            .map_err(|e| KeyError::MalformedSignature(e.to_string()))?;
        Ok(key.verify(bytes, &signature).is_ok())
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Public key in SPKI PEM form, for external verifiers.
    pub fn public_key_pem(&self) -> Result<String> {
        self.secret
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeyError::Malformed(e.to_string()))
    }

    /// Public key in JWK form.
    pub fn public_key_jwk(&self) -> String {
        self.secret.public_key().to_jwk_string()
    }

    /// Private key in PKCS#8 PEM form. Only the CLI `keygen` path uses
    /// this; the gateway never exports private material.
    pub fn private_key_pem(&self) -> Result<String> {
        use p256::pkcs8::EncodePrivateKey;
        self.secret
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| KeyError::Malformed(e.to_string()))
    }

    /// Parse an SPKI PEM public key, e.g. one configured for a known
    /// remote signer.
    pub fn public_key_from_pem(pem: &str) -> Result<VerifyingKey> {
        use p256::pkcs8::DecodePublicKey;
        VerifyingKey::from_public_key_pem(pem).map_err(|e| KeyError::Malformed(e.to_string()))
    }
}

impl std::fmt::Debug for SignatureService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureService").finish_non_exhaustive()
    }
}
