//! The staking registry that supplies current voting power.

use crate::ValsetMember;

/// Source of the live weighted membership.
///
/// The engine snapshots it into valsets and checks claimant membership
/// against it; it never mutates it.
pub trait MembershipRegistry {
    /// Current members and their voting power, in any order.
    fn current_members(&self) -> Vec<ValsetMember>;
}
