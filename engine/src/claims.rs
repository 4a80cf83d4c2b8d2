//! Claim ledger: every validator claim not yet finalized, keyed by
//! `(event_nonce, claimant)`.

use gravity_types::{AccountAddress, Claim};
use std::collections::BTreeMap;

#[derive(Default)]
pub struct ClaimLedger {
    claims: BTreeMap<u64, BTreeMap<AccountAddress, Claim>>,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event_nonce: u64, claimant: &AccountAddress) -> bool {
        self.claims
            .get(&event_nonce)
            .is_some_and(|by_claimant| by_claimant.contains_key(claimant))
    }

    /// Insert a claim. Callers check [`contains`](Self::contains) first; a
    /// second claim for the same key replaces nothing.
    pub fn insert(&mut self, claim: Claim) -> bool {
        let by_claimant = self.claims.entry(claim.event_nonce).or_default();
        if by_claimant.contains_key(&claim.claimant) {
            return false;
        }
        by_claimant.insert(claim.claimant.clone(), claim);
        true
    }

    /// Claims recorded for one event nonce, by claimant.
    pub fn claims_for(&self, event_nonce: u64) -> impl Iterator<Item = &Claim> {
        self.claims
            .get(&event_nonce)
            .into_iter()
            .flat_map(|by_claimant| by_claimant.values())
    }

    /// Drop every claim at or below `event_nonce`. Finalized nonces are
    /// answered with `Ignored` before the ledger is consulted.
    pub fn prune_through(&mut self, event_nonce: u64) {
        let Some(next) = event_nonce.checked_add(1) else {
            self.claims.clear();
            return;
        };
        self.claims = self.claims.split_off(&next);
    }

    pub fn len(&self) -> usize {
        self.claims.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gravity_types::{ClaimPayload, Timestamp};

    fn claim(nonce: u64, who: &str) -> Claim {
        Claim::new(
            nonce,
            AccountAddress::new(format!("grav1{who}")),
            ClaimPayload::Withdrawal {
                batch_nonce: 1,
                block_height: 7,
            },
            Timestamp::new(1),
        )
    }

    #[test]
    fn one_claim_per_claimant_and_nonce() {
        let mut ledger = ClaimLedger::new();
        assert!(ledger.insert(claim(1, "alice")));
        assert!(!ledger.insert(claim(1, "alice")));
        assert!(ledger.insert(claim(2, "alice")));
        assert!(ledger.contains(1, &AccountAddress::new("grav1alice")));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn claims_for_stays_within_nonce() {
        let mut ledger = ClaimLedger::new();
        for (nonce, who) in [(1, "bob"), (2, "alice"), (2, "carol"), (3, "alice")] {
            ledger.insert(claim(nonce, who));
        }
        let at_two: Vec<_> = ledger.claims_for(2).map(|c| c.claimant.as_str()).collect();
        assert_eq!(at_two, vec!["grav1alice", "grav1carol"]);
    }

    #[test]
    fn prune_drops_finalized_nonces() {
        let mut ledger = ClaimLedger::new();
        for nonce in 1..=4 {
            ledger.insert(claim(nonce, "alice"));
        }
        ledger.prune_through(2);
        assert_eq!(ledger.len(), 2);
        assert!(!ledger.contains(2, &AccountAddress::new("grav1alice")));
        assert!(ledger.contains(3, &AccountAddress::new("grav1alice")));

        ledger.prune_through(u64::MAX);
        assert!(ledger.is_empty());
    }
}
