//! Attestations: the aggregated claimant set behind one candidate fact.

use crate::{AccountAddress, ClaimPayload, ClaimType, ContentHash, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// All claims describing the same `(event_nonce, claim_type, payload)`.
///
/// Several attestations can exist for one event nonce when validators
/// disagree; at most one of them ever becomes observed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// Content hash of nonce, type and payload.
    pub id: ContentHash,
    pub event_nonce: u64,
    pub payload: ClaimPayload,
    /// Valset whose power snapshot decides quorum for this event nonce.
    pub valset_nonce: u64,
    /// Validators who asserted this exact fact.
    pub claimants: BTreeSet<AccountAddress>,
    /// Aggregate power of `claimants` in the pinned valset.
    pub power: u64,
    /// Set once, when power first crosses quorum.
    pub observed: bool,
    pub observed_at: Option<Timestamp>,
}

impl Attestation {
    pub fn new(
        id: ContentHash,
        event_nonce: u64,
        payload: ClaimPayload,
        valset_nonce: u64,
    ) -> Self {
        Self {
            id,
            event_nonce,
            payload,
            valset_nonce,
            claimants: BTreeSet::new(),
            power: 0,
            observed: false,
            observed_at: None,
        }
    }

    pub fn claim_type(&self) -> ClaimType {
        self.payload.claim_type()
    }
}

/// A fact that reached quorum but could not be applied.
///
/// The nonce sequence still advanced past it; the record exists only for
/// operator visibility.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyFailure {
    pub event_nonce: u64,
    pub attestation_id: ContentHash,
    pub claim_type: ClaimType,
    pub reason: String,
}
