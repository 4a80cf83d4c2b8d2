//! Valset manager: the append-only arena of validator set snapshots.
//!
//! Snapshot `n` is looked up by nonce for the whole life of the engine;
//! quorum for an event nonce or a subject is always computed against the
//! snapshot that was pinned for it, never the latest one.

use crate::error::BridgeError;
use gravity_crypto::valset_checkpoint;
use gravity_store::BridgeStore;
use gravity_types::event::{
    ATTR_SET_OPERATOR_ADDR, ATTR_VALSET_CONFIRM_KEY, ATTR_VALSET_NONCE,
    EVENT_MULTISIG_UPDATE_REQUEST,
};
use gravity_types::{
    AccountAddress, BridgeEvent, BridgeParams, EthAddress, Timestamp, Valset, ValsetMember,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Why a new snapshot is being considered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValsetTrigger {
    /// Snapshot only if normalized power moved past the drift threshold.
    PowerDrift,
    /// Scheduled snapshot; always taken.
    Periodic,
    /// Explicit request; only governance may make it.
    Admin { requester: AccountAddress },
}

pub struct ValsetManager {
    bridge_contract: EthAddress,
    governance: AccountAddress,
    power_drift_bps: u64,
    interval_secs: u64,
    valsets: BTreeMap<u64, Valset>,
    latest: Valset,
}

impl ValsetManager {
    /// Create the manager with the genesis snapshot (nonce 1) built from
    /// `members`.
    pub fn genesis<S: BridgeStore + ?Sized>(
        store: &S,
        params: &BridgeParams,
        members: Vec<ValsetMember>,
        now: Timestamp,
    ) -> Result<(Self, BridgeEvent), BridgeError> {
        let genesis = build_snapshot(&params.bridge_contract, 1, members, now)?;
        store.put_valset(&genesis)?;
        info!(
            members = genesis.members.len(),
            total_power = genesis.total_power,
            "genesis valset created"
        );
        let event = creation_event(&params.bridge_contract, &genesis);
        let manager = Self {
            bridge_contract: params.bridge_contract,
            governance: params.governance.clone(),
            power_drift_bps: params.power_drift_bps,
            interval_secs: params.valset_interval_secs,
            valsets: BTreeMap::from([(1, genesis.clone())]),
            latest: genesis,
        };
        Ok((manager, event))
    }

    pub fn latest(&self) -> &Valset {
        &self.latest
    }

    pub fn latest_nonce(&self) -> u64 {
        self.latest().nonce
    }

    pub fn get(&self, nonce: u64) -> Option<&Valset> {
        self.valsets.get(&nonce)
    }

    /// Power of `validator` in snapshot `valset_nonce`; zero if either is
    /// unknown.
    pub fn voting_power(&self, validator: &AccountAddress, valset_nonce: u64) -> u64 {
        self.valsets
            .get(&valset_nonce)
            .map_or(0, |vs| vs.power_of(validator))
    }

    pub fn total_power(&self, valset_nonce: u64) -> u64 {
        self.valsets.get(&valset_nonce).map_or(0, |vs| vs.total_power)
    }

    /// Snapshot whose power decides confirmations of valset `nonce`: the one
    /// before it, which is what the external chain still trusts.
    pub fn signing_valset_for(nonce: u64) -> u64 {
        nonce.saturating_sub(1).max(1)
    }

    /// Consider a new snapshot of `members`.
    ///
    /// Returns `Ok(None)` when a drift-triggered check finds nothing to do.
    pub fn request_update<S: BridgeStore + ?Sized>(
        &mut self,
        store: &S,
        trigger: ValsetTrigger,
        members: Vec<ValsetMember>,
        now: Timestamp,
    ) -> Result<Option<(Valset, BridgeEvent)>, BridgeError> {
        match &trigger {
            ValsetTrigger::Admin { requester } if requester != &self.governance => {
                return Err(BridgeError::Unauthorized {
                    requester: requester.clone(),
                    action: "request a valset update",
                });
            }
            ValsetTrigger::PowerDrift => {
                let drift = self.latest().power_drift_bps(&members);
                if drift <= self.power_drift_bps {
                    debug!(drift, threshold = self.power_drift_bps, "power drift below threshold");
                    return Ok(None);
                }
                info!(drift, threshold = self.power_drift_bps, "power drift exceeded");
            }
            _ => {}
        }
        self.snapshot(store, members, now).map(Some)
    }

    /// Per-block check: a drift snapshot if power moved, otherwise a
    /// periodic one once the interval has elapsed.
    pub fn end_block<S: BridgeStore + ?Sized>(
        &mut self,
        store: &S,
        members: Vec<ValsetMember>,
        now: Timestamp,
    ) -> Result<Vec<BridgeEvent>, BridgeError> {
        if let Some((_, event)) =
            self.request_update(store, ValsetTrigger::PowerDrift, members.clone(), now)?
        {
            return Ok(vec![event]);
        }
        let due = self.interval_secs > 0
            && self.latest().created_at.elapsed_since(now) >= self.interval_secs;
        if due {
            if let Some((_, event)) =
                self.request_update(store, ValsetTrigger::Periodic, members, now)?
            {
                return Ok(vec![event]);
            }
        }
        Ok(Vec::new())
    }

    fn snapshot<S: BridgeStore + ?Sized>(
        &mut self,
        store: &S,
        members: Vec<ValsetMember>,
        now: Timestamp,
    ) -> Result<(Valset, BridgeEvent), BridgeError> {
        let nonce = self.latest.nonce + 1;
        let valset = build_snapshot(&self.bridge_contract, nonce, members, now)?;
        store.put_valset(&valset)?;

        info!(
            valset_nonce = nonce,
            members = valset.members.len(),
            total_power = valset.total_power,
            "valset created"
        );
        let event = creation_event(&self.bridge_contract, &valset);
        self.valsets.insert(nonce, valset.clone());
        self.latest = valset.clone();
        Ok((valset, event))
    }
}

fn build_snapshot(
    bridge_contract: &EthAddress,
    nonce: u64,
    members: Vec<ValsetMember>,
    now: Timestamp,
) -> Result<Valset, BridgeError> {
    let valset = Valset::new(nonce, members, now);
    if valset.total_power == 0 {
        return Err(BridgeError::EmptyMembership);
    }
    let checkpoint = valset_checkpoint(bridge_contract, nonce, &valset.members);
    Ok(valset.with_checkpoint(checkpoint))
}

fn creation_event(bridge_contract: &EthAddress, valset: &Valset) -> BridgeEvent {
    BridgeEvent::new(EVENT_MULTISIG_UPDATE_REQUEST)
        .attr(ATTR_VALSET_CONFIRM_KEY, valset.checkpoint.to_hex())
        .attr(ATTR_VALSET_NONCE, valset.nonce)
        .attr(ATTR_SET_OPERATOR_ADDR, bridge_contract)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gravity_nullables::NullStore;

    fn member(name: &str, power: u64) -> ValsetMember {
        ValsetMember::new(AccountAddress::new(format!("grav1{name}")), power)
    }

    fn manager(store: &NullStore, params: &BridgeParams) -> ValsetManager {
        let members = vec![member("alice", 50), member("bob", 30), member("carol", 20)];
        ValsetManager::genesis(store, params, members, Timestamp::new(100))
            .unwrap()
            .0
    }

    #[test]
    fn genesis_is_nonce_one_and_persisted() {
        let store = NullStore::new();
        let params = BridgeParams::default();
        let (vm, event) = ValsetManager::genesis(
            &store,
            &params,
            vec![member("alice", 10)],
            Timestamp::EPOCH,
        )
        .unwrap();
        assert_eq!(vm.latest_nonce(), 1);
        assert_eq!(event.name, EVENT_MULTISIG_UPDATE_REQUEST);
        assert_eq!(event.get(ATTR_VALSET_NONCE), Some("1"));
        assert_eq!(
            event.get(ATTR_VALSET_CONFIRM_KEY),
            Some(vm.latest().checkpoint.to_hex().as_str())
        );
        use gravity_store::ValsetStore;
        assert_eq!(store.get_valset(1).unwrap(), *vm.latest());
    }

    #[test]
    fn empty_membership_rejected() {
        let store = NullStore::new();
        let result =
            ValsetManager::genesis(&store, &BridgeParams::default(), vec![], Timestamp::EPOCH);
        assert!(matches!(result, Err(BridgeError::EmptyMembership)));
    }

    #[test]
    fn small_drift_is_ignored() {
        let store = NullStore::new();
        let params = BridgeParams::default();
        let mut vm = manager(&store, &params);
        // 50/30/20 -> 51/30/19: one percent moves, under the 5% default.
        let moved = vec![member("alice", 51), member("bob", 30), member("carol", 19)];
        let result = vm
            .request_update(&store, ValsetTrigger::PowerDrift, moved, Timestamp::new(200))
            .unwrap();
        assert!(result.is_none());
        assert_eq!(vm.latest_nonce(), 1);
    }

    #[test]
    fn large_drift_creates_snapshot() {
        let store = NullStore::new();
        let params = BridgeParams::default();
        let mut vm = manager(&store, &params);
        let moved = vec![member("alice", 20), member("bob", 30), member("carol", 50)];
        let (valset, event) = vm
            .request_update(&store, ValsetTrigger::PowerDrift, moved, Timestamp::new(200))
            .unwrap()
            .unwrap();
        assert_eq!(valset.nonce, 2);
        assert_eq!(event.get(ATTR_VALSET_NONCE), Some("2"));
        // Old snapshot still answers lookups.
        assert_eq!(vm.voting_power(&AccountAddress::new("grav1alice"), 1), 50);
        assert_eq!(vm.voting_power(&AccountAddress::new("grav1alice"), 2), 20);
        assert_eq!(vm.total_power(1), 100);
    }

    #[test]
    fn admin_requires_governance() {
        let store = NullStore::new();
        let params = BridgeParams::default();
        let mut vm = manager(&store, &params);
        let members = vm.latest().members.clone();

        let stranger = AccountAddress::new("grav1mallory");
        let err = vm
            .request_update(
                &store,
                ValsetTrigger::Admin {
                    requester: stranger,
                },
                members.clone(),
                Timestamp::new(1),
            )
            .unwrap_err();
        assert!(matches!(err, BridgeError::Unauthorized { .. }));

        let created = vm
            .request_update(
                &store,
                ValsetTrigger::Admin {
                    requester: params.governance.clone(),
                },
                members,
                Timestamp::new(1),
            )
            .unwrap();
        assert!(created.is_some());
        assert_eq!(vm.latest_nonce(), 2);
    }

    #[test]
    fn end_block_fires_periodic_when_due() {
        let store = NullStore::new();
        let params = BridgeParams {
            valset_interval_secs: 60,
            ..BridgeParams::default()
        };
        let mut vm = manager(&store, &params);
        let members = vm.latest().members.clone();

        assert!(vm
            .end_block(&store, members.clone(), Timestamp::new(159))
            .unwrap()
            .is_empty());
        let events = vm.end_block(&store, members, Timestamp::new(160)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(vm.latest_nonce(), 2);
    }

    #[test]
    fn signing_valset_is_previous() {
        assert_eq!(ValsetManager::signing_valset_for(1), 1);
        assert_eq!(ValsetManager::signing_valset_for(5), 4);
    }
}
