//! Validator set snapshots.

use crate::{AccountAddress, ContentHash, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed-point scale used to normalize power before comparing snapshots.
const NORMALIZED_SCALE: u128 = 1 << 32;
const BPS_DENOMINATOR: u128 = 10_000;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValsetMember {
    pub validator: AccountAddress,
    pub power: u64,
}

impl ValsetMember {
    pub fn new(validator: AccountAddress, power: u64) -> Self {
        Self { validator, power }
    }
}

/// An immutable weighted snapshot of the validator membership.
///
/// Members are kept sorted by power descending, then address ascending, so
/// two snapshots of the same membership are byte-identical.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valset {
    pub nonce: u64,
    pub members: Vec<ValsetMember>,
    pub total_power: u64,
    pub created_at: Timestamp,
    /// Digest validators sign to confirm the update.
    pub checkpoint: ContentHash,
}

impl Valset {
    /// Build a snapshot. Zero-power members are dropped and duplicate
    /// validators are merged.
    pub fn new(
        nonce: u64,
        members: impl IntoIterator<Item = ValsetMember>,
        created_at: Timestamp,
    ) -> Self {
        let members = canonical_members(members);
        let total_power = members
            .iter()
            .fold(0u64, |acc, m| acc.saturating_add(m.power));
        Self {
            nonce,
            members,
            total_power,
            created_at,
            checkpoint: ContentHash::ZERO,
        }
    }

    pub fn with_checkpoint(mut self, checkpoint: ContentHash) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    /// Power of `validator` in this snapshot, zero if absent.
    pub fn power_of(&self, validator: &AccountAddress) -> u64 {
        self.members
            .iter()
            .find(|m| &m.validator == validator)
            .map_or(0, |m| m.power)
    }

    pub fn contains(&self, validator: &AccountAddress) -> bool {
        self.members.iter().any(|m| &m.validator == validator)
    }

    /// Whether `members` describes the same weighted membership.
    pub fn same_members(&self, members: &[ValsetMember]) -> bool {
        Self::canonical_members(members) == self.members
    }

    /// Members in snapshot order: duplicates merged, zero power dropped,
    /// sorted by power descending then address ascending.
    pub fn canonical_members(members: &[ValsetMember]) -> Vec<ValsetMember> {
        canonical_members(members.iter().cloned())
    }

    /// Share of normalized power that moved between this snapshot and
    /// `members`, in basis points: half the sum of absolute per-validator
    /// differences.
    pub fn power_drift_bps(&self, members: &[ValsetMember]) -> u64 {
        let before = normalized(&self.members);
        let canon = canonical_members(members.iter().cloned());
        let after = normalized(&canon);

        let mut diff: u128 = 0;
        for (validator, old) in &before {
            let new = after.get(validator).copied().unwrap_or(0);
            diff += old.abs_diff(new);
        }
        for (validator, new) in &after {
            if !before.contains_key(validator) {
                diff += new;
            }
        }
        let bps = diff * BPS_DENOMINATOR / (2 * NORMALIZED_SCALE);
        bps.min(BPS_DENOMINATOR) as u64
    }
}

fn canonical_members(members: impl IntoIterator<Item = ValsetMember>) -> Vec<ValsetMember> {
    let mut merged: BTreeMap<AccountAddress, u64> = BTreeMap::new();
    for m in members {
        let entry = merged.entry(m.validator).or_insert(0);
        *entry = entry.saturating_add(m.power);
    }
    let mut out: Vec<ValsetMember> = merged
        .into_iter()
        .filter(|(_, power)| *power > 0)
        .map(|(validator, power)| ValsetMember { validator, power })
        .collect();
    out.sort_by(|a, b| b.power.cmp(&a.power).then_with(|| a.validator.cmp(&b.validator)));
    out
}

fn normalized(members: &[ValsetMember]) -> BTreeMap<&AccountAddress, u128> {
    let total: u128 = members.iter().map(|m| m.power as u128).sum();
    if total == 0 {
        return BTreeMap::new();
    }
    members
        .iter()
        .map(|m| (&m.validator, m.power as u128 * NORMALIZED_SCALE / total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, power: u64) -> ValsetMember {
        ValsetMember::new(AccountAddress::new(format!("grav1{name}")), power)
    }

    #[test]
    fn members_sorted_by_power_then_address() {
        let vs = Valset::new(
            1,
            vec![member("carol", 10), member("bob", 30), member("alice", 30)],
            Timestamp::new(5),
        );
        let names: Vec<_> = vs.members.iter().map(|m| m.validator.as_str()).collect();
        assert_eq!(names, vec!["grav1alice", "grav1bob", "grav1carol"]);
        assert_eq!(vs.total_power, 70);
    }

    #[test]
    fn zero_power_members_dropped_and_duplicates_merged() {
        let vs = Valset::new(
            1,
            vec![member("alice", 0), member("bob", 5), member("bob", 7)],
            Timestamp::EPOCH,
        );
        assert_eq!(vs.members, vec![member("bob", 12)]);
        assert!(!vs.contains(&AccountAddress::new("grav1alice")));
    }

    #[test]
    fn power_of_absent_validator_is_zero() {
        let vs = Valset::new(1, vec![member("alice", 10)], Timestamp::EPOCH);
        assert_eq!(vs.power_of(&AccountAddress::new("grav1alice")), 10);
        assert_eq!(vs.power_of(&AccountAddress::new("grav1mallory")), 0);
    }

    #[test]
    fn identical_membership_has_no_drift() {
        let vs = Valset::new(1, vec![member("a", 50), member("b", 50)], Timestamp::EPOCH);
        assert_eq!(vs.power_drift_bps(&[member("b", 50), member("a", 50)]), 0);
        assert!(vs.same_members(&[member("b", 50), member("a", 50)]));
    }

    #[test]
    fn scaled_membership_has_no_drift() {
        let vs = Valset::new(1, vec![member("a", 50), member("b", 50)], Timestamp::EPOCH);
        assert_eq!(vs.power_drift_bps(&[member("a", 100), member("b", 100)]), 0);
    }

    #[test]
    fn replaced_validator_is_full_drift_share() {
        let vs = Valset::new(1, vec![member("a", 50), member("b", 50)], Timestamp::EPOCH);
        // b's half of the power moved to c.
        assert_eq!(vs.power_drift_bps(&[member("a", 50), member("c", 50)]), 5_000);
        assert_eq!(vs.power_drift_bps(&[member("x", 1)]), 10_000);
    }

    #[test]
    fn small_shift_measured_in_bps() {
        let vs = Valset::new(1, vec![member("a", 60), member("b", 40)], Timestamp::EPOCH);
        let drift = vs.power_drift_bps(&[member("a", 55), member("b", 45)]);
        assert!((499..=500).contains(&drift), "drift was {drift}");
    }
}
