//! Signer-identity to public-key lookup.

use std::collections::HashMap;

use p256::ecdsa::VerifyingKey;

/// Resolves the verifying key for the signer identity recorded in a
/// document's signature block (`who.identifier.value`).
pub trait KeyRegistry: Send + Sync {
    fn verifying_key(&self, signer: &str) -> Option<VerifyingKey>;
}

/// Fixed registry built at startup from configuration.
///
/// Unknown identities fall back to the default key so single-key
/// deployments keep verifying documents signed before the identity was
/// registered.
#[derive(Debug, Clone)]
pub struct StaticKeyRegistry {
    default: VerifyingKey,
    known: HashMap<String, VerifyingKey>,
}

impl StaticKeyRegistry {
    pub fn new(default: VerifyingKey) -> Self {
        Self {
            default,
            known: HashMap::new(),
        }
    }

    pub fn insert(&mut self, signer: impl Into<String>, key: VerifyingKey) {
        self.known.insert(signer.into(), key);
    }

    pub fn default_key(&self) -> &VerifyingKey {
        &self.default
    }
}

impl KeyRegistry for StaticKeyRegistry {
    fn verifying_key(&self, signer: &str) -> Option<VerifyingKey> {
        Some(self.known.get(signer).copied().unwrap_or(self.default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SignatureService;

    #[test]
    fn known_signer_resolves_to_registered_key() {
        let default = SignatureService::ephemeral();
        let other = SignatureService::ephemeral();
        let mut registry = StaticKeyRegistry::new(*default.verifying_key());
        registry.insert("lab-a", *other.verifying_key());

        assert_eq!(
            registry.verifying_key("lab-a"),
            Some(*other.verifying_key())
        );
    }

    #[test]
    fn unknown_signer_falls_back_to_default() {
        let default = SignatureService::ephemeral();
        let registry = StaticKeyRegistry::new(*default.verifying_key());

        assert_eq!(
            registry.verifying_key("never-seen"),
            Some(*default.verifying_key())
        );
    }
}
