//! Attestation and apply-failure storage trait.

use crate::StoreError;
use gravity_types::{ApplyFailure, Attestation, ContentHash};

pub trait AttestationStore {
    /// Insert or overwrite an attestation (claimant sets grow in place).
    fn put_attestation(&self, attestation: &Attestation) -> Result<(), StoreError>;

    fn get_attestation(&self, id: &ContentHash) -> Result<Attestation, StoreError>;

    /// Drop a losing attestation once its nonce has been finalized.
    fn delete_attestation(&self, id: &ContentHash) -> Result<(), StoreError>;

    fn put_apply_failure(&self, failure: &ApplyFailure) -> Result<(), StoreError>;
}
