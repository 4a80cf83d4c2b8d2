//! Confirmation collector: validator signatures over batch, valset and
//! logic call checkpoints.
//!
//! The collector only stores confirmations. Whether a subject exists, what
//! its checkpoint is and which valset weighs it are resolved by the caller
//! into a [`SubjectInfo`].

use crate::error::BridgeError;
use crate::valset::ValsetManager;
use gravity_crypto::ProofVerifier;
use gravity_store::BridgeStore;
use gravity_types::{
    AccountAddress, BatchStatus, ConfirmSubject, Confirmation, ContentHash, Quorum,
};
use std::collections::BTreeMap;
use tracing::debug;

/// What the collector needs to know about a subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubjectInfo {
    pub checkpoint: ContentHash,
    /// Valset whose power decides relay readiness.
    pub valset_nonce: u64,
    pub status: BatchStatus,
}

pub struct ConfirmationCollector {
    quorum: Quorum,
    confirmations: BTreeMap<ConfirmSubject, BTreeMap<AccountAddress, Confirmation>>,
}

impl ConfirmationCollector {
    pub fn new(quorum: Quorum) -> Self {
        Self {
            quorum,
            confirmations: BTreeMap::new(),
        }
    }

    pub fn confirm<S: BridgeStore + ?Sized, V: ProofVerifier + ?Sized>(
        &mut self,
        store: &S,
        verifier: &V,
        subject: ConfirmSubject,
        info: Option<SubjectInfo>,
        confirmer: AccountAddress,
        proof: Vec<u8>,
    ) -> Result<(), BridgeError> {
        let info = match info {
            Some(info) if info.status != BatchStatus::Canceled => info,
            _ => return Err(BridgeError::UnknownSubject(subject)),
        };
        if info.status == BatchStatus::Relayed {
            return Err(BridgeError::NotPending(subject));
        }
        let existing = self.confirmations.get(&subject);
        if existing.is_some_and(|by| by.contains_key(&confirmer)) {
            return Err(BridgeError::DuplicateConfirmation { subject, confirmer });
        }
        if !verifier.verify(&info.checkpoint, &confirmer, &proof) {
            return Err(BridgeError::InvalidProof { subject, confirmer });
        }

        let confirmation = Confirmation {
            subject: subject.clone(),
            confirmer: confirmer.clone(),
            proof,
        };
        store.put_confirmation(&confirmation)?;
        debug!(%subject, %confirmer, "confirmation recorded");
        self.confirmations
            .entry(subject)
            .or_default()
            .insert(confirmer, confirmation);
        Ok(())
    }

    /// Power behind `subject` in the valset that weighs it.
    pub fn confirmed_power(
        &self,
        subject: &ConfirmSubject,
        valset_nonce: u64,
        valsets: &ValsetManager,
    ) -> u64 {
        self.confirmations.get(subject).map_or(0, |by| {
            by.keys().fold(0u64, |acc, v| {
                acc.saturating_add(valsets.voting_power(v, valset_nonce))
            })
        })
    }

    /// Pending and confirmed by at least a quorum of its valset's power.
    pub fn is_relay_ready(
        &self,
        subject: &ConfirmSubject,
        info: Option<SubjectInfo>,
        valsets: &ValsetManager,
    ) -> bool {
        let Some(info) = info else {
            return false;
        };
        if info.status != BatchStatus::Pending {
            return false;
        }
        let power = self.confirmed_power(subject, info.valset_nonce, valsets);
        self.quorum
            .reached_by(power, valsets.total_power(info.valset_nonce))
    }

    /// Confirmations for `subject`, by confirmer. Canceled subjects keep
    /// theirs.
    pub fn confirmations(&self, subject: &ConfirmSubject) -> Vec<&Confirmation> {
        self.confirmations
            .get(subject)
            .map(|by| by.values().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gravity_nullables::{NullStore, NullVerifier};
    use gravity_store::ConfirmationStore;
    use gravity_types::{BridgeParams, Timestamp, ValsetMember};

    fn addr(name: &str) -> AccountAddress {
        AccountAddress::new(format!("grav1{name}"))
    }

    fn setup(store: &NullStore) -> ValsetManager {
        let members = vec![
            ValsetMember::new(addr("a"), 40),
            ValsetMember::new(addr("b"), 30),
            ValsetMember::new(addr("c"), 30),
        ];
        ValsetManager::genesis(store, &BridgeParams::default(), members, Timestamp::EPOCH)
            .unwrap()
            .0
    }

    fn confirm(
        collector: &mut ConfirmationCollector,
        store: &NullStore,
        verifier: &NullVerifier,
        subject: &ConfirmSubject,
        info: Option<SubjectInfo>,
        who: &str,
    ) -> Result<(), BridgeError> {
        collector.confirm(store, verifier, subject.clone(), info, addr(who), b"sig".to_vec())
    }

    fn pending() -> Option<SubjectInfo> {
        Some(SubjectInfo {
            checkpoint: ContentHash::new([1; 32]),
            valset_nonce: 1,
            status: BatchStatus::Pending,
        })
    }

    #[test]
    fn ready_at_two_thirds_inclusive() {
        let store = NullStore::new();
        let valsets = setup(&store);
        let verifier = NullVerifier::new();
        let mut collector = ConfirmationCollector::new(Quorum::TWO_THIRDS);
        let subject = ConfirmSubject::Batch(1);

        confirm(&mut collector, &store, &verifier, &subject, pending(), "a").unwrap();
        assert!(!collector.is_relay_ready(&subject, pending(), &valsets));
        confirm(&mut collector, &store, &verifier, &subject, pending(), "b").unwrap();
        assert_eq!(collector.confirmed_power(&subject, 1, &valsets), 70);
        assert!(collector.is_relay_ready(&subject, pending(), &valsets));
        assert_eq!(store.get_confirmations(&subject).unwrap().len(), 2);
    }

    #[test]
    fn rejects_duplicates_bad_proofs_and_missing_subjects() {
        let store = NullStore::new();
        let verifier = NullVerifier::new();
        verifier.reject(&addr("c"));
        let mut collector = ConfirmationCollector::new(Quorum::TWO_THIRDS);
        let subject = ConfirmSubject::Valset(1);

        confirm(&mut collector, &store, &verifier, &subject, pending(), "a").unwrap();
        assert!(matches!(
            confirm(&mut collector, &store, &verifier, &subject, pending(), "a"),
            Err(BridgeError::DuplicateConfirmation { .. })
        ));
        assert!(matches!(
            confirm(&mut collector, &store, &verifier, &subject, pending(), "c"),
            Err(BridgeError::InvalidProof { .. })
        ));
        assert!(matches!(
            confirm(&mut collector, &store, &verifier, &ConfirmSubject::Batch(9), None, "a"),
            Err(BridgeError::UnknownSubject(_))
        ));
        assert_eq!(collector.confirmations(&subject).len(), 1);
    }

    #[test]
    fn canceled_subject_is_never_ready_but_keeps_confirmations() {
        let store = NullStore::new();
        let valsets = setup(&store);
        let verifier = NullVerifier::new();
        let mut collector = ConfirmationCollector::new(Quorum::TWO_THIRDS);
        let subject = ConfirmSubject::Batch(2);
        for who in ["a", "b", "c"] {
            confirm(&mut collector, &store, &verifier, &subject, pending(), who).unwrap();
        }
        let canceled = Some(SubjectInfo {
            status: BatchStatus::Canceled,
            ..pending().unwrap()
        });
        assert!(!collector.is_relay_ready(&subject, canceled, &valsets));
        assert_eq!(collector.confirmations(&subject).len(), 3);
        assert!(matches!(
            confirm(&mut collector, &store, &verifier, &subject, canceled, "d"),
            Err(BridgeError::UnknownSubject(_))
        ));
    }
}
