//! Attestation aggregator: groups identical claims and decides when one of
//! them carries enough power to be observed.
//!
//! Each event nonce is pinned to the valset that was latest when the first
//! claim for it arrived. Later membership changes do not move the pin, so a
//! new valset cannot retroactively push an old event over quorum.

use crate::valset::ValsetManager;
use gravity_crypto::attestation_id;
use gravity_types::{Attestation, Claim, ContentHash, Quorum, Timestamp};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Result of recording one claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Still below quorum.
    Pending { power: u64, total: u64 },
    /// This claim pushed the attestation over quorum.
    Observed,
}

pub struct AttestationAggregator {
    quorum: Quorum,
    attestations: BTreeMap<ContentHash, Attestation>,
    by_nonce: BTreeMap<u64, BTreeSet<ContentHash>>,
    pinned: BTreeMap<u64, u64>,
    observed: BTreeMap<u64, ContentHash>,
}

impl AttestationAggregator {
    pub fn new(quorum: Quorum) -> Self {
        Self {
            quorum,
            attestations: BTreeMap::new(),
            by_nonce: BTreeMap::new(),
            pinned: BTreeMap::new(),
            observed: BTreeMap::new(),
        }
    }

    /// Valset nonce deciding quorum for `event_nonce`, if any claim has
    /// arrived for it yet.
    pub fn pinned_valset(&self, event_nonce: u64) -> Option<u64> {
        self.pinned.get(&event_nonce).copied()
    }

    /// Whether some attestation for `event_nonce` already reached quorum.
    pub fn nonce_observed(&self, event_nonce: u64) -> bool {
        self.observed.contains_key(&event_nonce)
    }

    pub fn get(&self, id: &ContentHash) -> Option<&Attestation> {
        self.attestations.get(id)
    }

    /// Every live attestation variant for `event_nonce`.
    pub fn attestations_at(&self, event_nonce: u64) -> impl Iterator<Item = &Attestation> {
        self.by_nonce
            .get(&event_nonce)
            .into_iter()
            .flat_map(|ids| ids.iter().filter_map(|id| self.attestations.get(id)))
    }

    /// Add `claim` to its attestation and recompute power against the
    /// pinned valset: [`tally`](Self::tally) then [`insert`](Self::insert).
    ///
    /// The caller guarantees the claimant has not claimed this nonce before
    /// and that the nonce is neither observed nor finalized.
    pub fn record(
        &mut self,
        claim: &Claim,
        valsets: &ValsetManager,
        now: Timestamp,
    ) -> (&Attestation, RecordOutcome) {
        let (attestation, outcome) = self.tally(claim, valsets, now);
        (self.insert(attestation, outcome), outcome)
    }

    /// The attestation `claim` would produce, without recording it.
    pub fn tally(
        &self,
        claim: &Claim,
        valsets: &ValsetManager,
        now: Timestamp,
    ) -> (Attestation, RecordOutcome) {
        let id = attestation_id(claim.event_nonce, &claim.payload);
        let valset_nonce = self
            .pinned_valset(claim.event_nonce)
            .unwrap_or_else(|| valsets.latest_nonce());

        let mut attestation = self.attestations.get(&id).cloned().unwrap_or_else(|| {
            Attestation::new(id, claim.event_nonce, claim.payload.clone(), valset_nonce)
        });
        attestation.claimants.insert(claim.claimant.clone());
        attestation.power = attestation
            .claimants
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(valsets.voting_power(c, valset_nonce)));

        let total = valsets.total_power(valset_nonce);
        let crossed = !attestation.observed
            && !self.nonce_observed(claim.event_nonce)
            && self.quorum.exceeded_by(attestation.power, total);

        let outcome = if crossed {
            attestation.observed = true;
            attestation.observed_at = Some(now);
            RecordOutcome::Observed
        } else {
            RecordOutcome::Pending {
                power: attestation.power,
                total,
            }
        };
        (attestation, outcome)
    }

    /// Install an attestation produced by [`tally`](Self::tally).
    pub fn insert(&mut self, attestation: Attestation, outcome: RecordOutcome) -> &Attestation {
        let id = attestation.id;
        let event_nonce = attestation.event_nonce;
        self.pinned.entry(event_nonce).or_insert(attestation.valset_nonce);
        self.by_nonce.entry(event_nonce).or_default().insert(id);

        match outcome {
            RecordOutcome::Observed => {
                self.observed.insert(event_nonce, id);
                info!(
                    event_nonce,
                    attestation_id = %id,
                    claim_type = %attestation.claim_type(),
                    power = attestation.power,
                    "attestation observed"
                );
            }
            RecordOutcome::Pending { power, total } => {
                debug!(event_nonce, attestation_id = %id, power, total, "claim recorded");
            }
        }

        match self.attestations.entry(id) {
            Entry::Occupied(mut slot) => {
                slot.insert(attestation);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(attestation),
        }
    }

    /// Ids of the variants for `event_nonce` that lost to the observed one.
    pub fn losers(&self, event_nonce: u64) -> Vec<ContentHash> {
        let winner = self.observed.get(&event_nonce);
        self.by_nonce
            .get(&event_nonce)
            .into_iter()
            .flatten()
            .filter(|id| Some(*id) != winner)
            .copied()
            .collect()
    }

    /// Forget everything about `event_nonce` once it has been applied.
    ///
    /// Returns the ids of the losing variants, as [`losers`](Self::losers)
    /// reported them.
    pub fn finalize(&mut self, event_nonce: u64) -> Vec<ContentHash> {
        let losers = self.losers(event_nonce);
        self.observed.remove(&event_nonce);
        self.pinned.remove(&event_nonce);
        for id in self.by_nonce.remove(&event_nonce).unwrap_or_default() {
            self.attestations.remove(&id);
        }
        losers
    }

    /// Number of live attestations, observed or not.
    pub fn len(&self) -> usize {
        self.attestations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attestations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valset::ValsetTrigger;
    use gravity_nullables::NullStore;
    use gravity_types::{AccountAddress, BridgeParams, ClaimPayload, ValsetMember};

    fn addr(name: &str) -> AccountAddress {
        AccountAddress::new(format!("grav1{name}"))
    }

    fn valsets(store: &NullStore, powers: &[(&str, u64)]) -> ValsetManager {
        let members = powers
            .iter()
            .map(|(n, p)| ValsetMember::new(addr(n), *p))
            .collect();
        ValsetManager::genesis(store, &BridgeParams::default(), members, Timestamp::EPOCH)
            .unwrap()
            .0
    }

    fn withdrawal(nonce: u64, who: &str, batch_nonce: u64) -> Claim {
        Claim::new(
            nonce,
            addr(who),
            ClaimPayload::Withdrawal {
                batch_nonce,
                block_height: 10,
            },
            Timestamp::new(1),
        )
    }

    #[test]
    fn sixty_seven_of_hundred_observes() {
        let store = NullStore::new();
        let vs = valsets(&store, &[("a", 67), ("b", 33)]);
        let mut agg = AttestationAggregator::new(Quorum::TWO_THIRDS);
        let (_, outcome) = agg.record(&withdrawal(1, "a", 1), &vs, Timestamp::new(2));
        assert_eq!(outcome, RecordOutcome::Observed);
        assert!(agg.nonce_observed(1));
    }

    #[test]
    fn sixty_six_of_hundred_does_not() {
        let store = NullStore::new();
        let vs = valsets(&store, &[("a", 66), ("b", 34)]);
        let mut agg = AttestationAggregator::new(Quorum::TWO_THIRDS);
        let (att, outcome) = agg.record(&withdrawal(1, "a", 1), &vs, Timestamp::new(2));
        assert!(!att.observed);
        assert_eq!(
            outcome,
            RecordOutcome::Pending {
                power: 66,
                total: 100
            }
        );
    }

    #[test]
    fn thirty_plus_thirty_pending_then_ten_more_observes() {
        let store = NullStore::new();
        let vs = valsets(&store, &[("a", 30), ("b", 30), ("c", 10), ("d", 30)]);
        let mut agg = AttestationAggregator::new(Quorum::TWO_THIRDS);
        agg.record(&withdrawal(5, "a", 1), &vs, Timestamp::new(1));
        let (att, outcome) = agg.record(&withdrawal(5, "b", 1), &vs, Timestamp::new(1));
        assert_eq!(att.power, 60);
        assert!(!att.observed);
        assert!(matches!(outcome, RecordOutcome::Pending { .. }));

        let (att, outcome) = agg.record(&withdrawal(5, "c", 1), &vs, Timestamp::new(3));
        assert_eq!(att.power, 70);
        assert!(att.observed);
        assert_eq!(att.observed_at, Some(Timestamp::new(3)));
        assert_eq!(outcome, RecordOutcome::Observed);
    }

    #[test]
    fn conflicting_payloads_form_separate_attestations() {
        let store = NullStore::new();
        let vs = valsets(&store, &[("a", 40), ("b", 40), ("c", 20)]);
        let mut agg = AttestationAggregator::new(Quorum::TWO_THIRDS);
        agg.record(&withdrawal(1, "a", 1), &vs, Timestamp::EPOCH);
        agg.record(&withdrawal(1, "b", 2), &vs, Timestamp::EPOCH);
        assert_eq!(agg.attestations_at(1).count(), 2);
        assert!(!agg.nonce_observed(1));

        let (_, outcome) = agg.record(&withdrawal(1, "c", 1), &vs, Timestamp::EPOCH);
        // 60 of 100 is not more than two thirds.
        assert!(matches!(outcome, RecordOutcome::Pending { power: 60, .. }));
    }

    #[test]
    fn pin_survives_membership_change() {
        let store = NullStore::new();
        let mut vs = valsets(&store, &[("a", 50), ("b", 50)]);
        let mut agg = AttestationAggregator::new(Quorum::TWO_THIRDS);
        agg.record(&withdrawal(1, "a", 1), &vs, Timestamp::EPOCH);
        assert_eq!(agg.pinned_valset(1), Some(1));

        // "c" takes over almost all power in valset 2.
        let members = vec![
            ValsetMember::new(addr("a"), 1),
            ValsetMember::new(addr("b"), 1),
            ValsetMember::new(addr("c"), 98),
        ];
        vs.request_update(&store, ValsetTrigger::PowerDrift, members, Timestamp::new(5))
            .unwrap()
            .unwrap();

        // "c" has no power in the pinned valset, so quorum is not reached.
        let (att, _) = agg.record(&withdrawal(1, "c", 1), &vs, Timestamp::new(6));
        assert_eq!(att.valset_nonce, 1);
        assert_eq!(att.power, 50);
        assert!(!att.observed);

        // A fresh nonce pins the new valset.
        agg.record(&withdrawal(2, "c", 1), &vs, Timestamp::new(6));
        assert_eq!(agg.pinned_valset(2), Some(2));
        assert!(agg.nonce_observed(2));
    }

    #[test]
    fn finalize_discards_losers() {
        let store = NullStore::new();
        let vs = valsets(&store, &[("a", 80), ("b", 20)]);
        let mut agg = AttestationAggregator::new(Quorum::TWO_THIRDS);
        let (loser, _) = agg.record(&withdrawal(1, "b", 9), &vs, Timestamp::EPOCH);
        let loser_id = loser.id;
        agg.record(&withdrawal(1, "a", 1), &vs, Timestamp::EPOCH);

        assert_eq!(agg.losers(1), vec![loser_id]);
        let losers = agg.finalize(1);
        assert_eq!(losers, vec![loser_id]);
        assert!(agg.is_empty());
        assert!(!agg.nonce_observed(1));
        assert_eq!(agg.pinned_valset(1), None);
    }

    #[test]
    fn tally_leaves_aggregator_untouched() {
        let store = NullStore::new();
        let vs = valsets(&store, &[("a", 70), ("b", 30)]);
        let mut agg = AttestationAggregator::new(Quorum::TWO_THIRDS);
        agg.record(&withdrawal(1, "b", 1), &vs, Timestamp::EPOCH);

        let (att, outcome) = agg.tally(&withdrawal(1, "a", 1), &vs, Timestamp::new(4));
        assert_eq!(outcome, RecordOutcome::Observed);
        assert_eq!(att.power, 100);
        assert!(!agg.nonce_observed(1));
        assert_eq!(agg.get(&att.id).unwrap().power, 30);

        // Dropping the tally is the same as never seeing the claim.
        let (att, outcome) = agg.record(&withdrawal(1, "a", 1), &vs, Timestamp::new(4));
        assert_eq!(outcome, RecordOutcome::Observed);
        assert_eq!(att.claimants.len(), 2);
        assert!(agg.nonce_observed(1));
    }

    #[test]
    fn tally_of_fresh_nonce_does_not_pin() {
        let store = NullStore::new();
        let vs = valsets(&store, &[("a", 50), ("b", 50)]);
        let agg = AttestationAggregator::new(Quorum::TWO_THIRDS);
        let (att, _) = agg.tally(&withdrawal(3, "a", 1), &vs, Timestamp::EPOCH);
        assert_eq!(att.valset_nonce, 1);
        assert_eq!(agg.pinned_valset(3), None);
        assert!(agg.is_empty());
    }
}
