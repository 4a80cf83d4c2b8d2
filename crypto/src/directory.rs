//! Delegate key directory: which Ed25519 key signs for which validator.

use crate::keys::{PublicKey, Signature};
use crate::sign::verify_signature;
use gravity_types::{AccountAddress, ContentHash};
use std::collections::HashMap;
use thiserror::Error;

/// Proof-verification collaborator consumed by the confirmation collector.
pub trait ProofVerifier {
    /// Whether `proof` is `confirmer`'s valid authorization of `checkpoint`.
    fn verify(&self, checkpoint: &ContentHash, confirmer: &AccountAddress, proof: &[u8]) -> bool;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("delegate key already registered to {0}")]
    KeyInUse(AccountAddress),

    #[error("malformed delegate key")]
    MalformedKey,
}

/// Maps each validator to the delegate key that signs its confirmations.
///
/// A key may back only one validator; re-registering a validator replaces
/// its previous key.
#[derive(Default)]
pub struct KeyDirectory {
    keys: HashMap<AccountAddress, PublicKey>,
    owners: HashMap<PublicKey, AccountAddress>,
}

impl KeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        validator: AccountAddress,
        key: PublicKey,
    ) -> Result<(), DirectoryError> {
        if ed25519_dalek::VerifyingKey::from_bytes(&key.0).is_err() {
            return Err(DirectoryError::MalformedKey);
        }
        match self.owners.get(&key) {
            Some(owner) if owner != &validator => {
                return Err(DirectoryError::KeyInUse(owner.clone()));
            }
            _ => {}
        }
        if let Some(old) = self.keys.insert(validator.clone(), key) {
            self.owners.remove(&old);
        }
        self.owners.insert(key, validator);
        Ok(())
    }

    pub fn key_of(&self, validator: &AccountAddress) -> Option<&PublicKey> {
        self.keys.get(validator)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl ProofVerifier for KeyDirectory {
    fn verify(&self, checkpoint: &ContentHash, confirmer: &AccountAddress, proof: &[u8]) -> bool {
        let Some(key) = self.keys.get(confirmer) else {
            tracing::debug!(%confirmer, "no delegate key registered");
            return false;
        };
        let Some(sig) = Signature::from_slice(proof) else {
            return false;
        };
        verify_signature(checkpoint.as_bytes(), &sig, key)
    }
}
