//! Nullable proof verifier: accepts every proof except from blocked signers.

use gravity_crypto::ProofVerifier;
use gravity_types::{AccountAddress, ContentHash};
use std::collections::HashSet;
use std::sync::Mutex;

/// Accepts any non-empty proof unless the confirmer has been marked as a
/// forger with [`NullVerifier::reject`].
#[derive(Default)]
pub struct NullVerifier {
    rejected: Mutex<HashSet<AccountAddress>>,
}

impl NullVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&self, confirmer: &AccountAddress) {
        self.rejected.lock().unwrap().insert(confirmer.clone());
    }
}

impl ProofVerifier for NullVerifier {
    fn verify(&self, _checkpoint: &ContentHash, confirmer: &AccountAddress, proof: &[u8]) -> bool {
        !proof.is_empty() && !self.rejected.lock().unwrap().contains(confirmer)
    }
}
