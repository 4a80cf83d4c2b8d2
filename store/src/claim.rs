//! Claim storage trait.

use crate::StoreError;
use gravity_types::{AccountAddress, Claim};

/// Raw per-validator claims, keyed by `(claimant, event_nonce)`.
pub trait ClaimStore {
    fn put_claim(&self, claim: &Claim) -> Result<(), StoreError>;

    fn get_claim(&self, claimant: &AccountAddress, event_nonce: u64) -> Result<Claim, StoreError>;

    fn claim_count(&self) -> Result<u64, StoreError>;
}
