//! Nullable staking registry: membership set directly by the test.

use gravity_types::{AccountAddress, MembershipRegistry, ValsetMember};
use std::sync::Mutex;

/// A registry whose membership is whatever the test last configured.
pub struct NullRegistry {
    members: Mutex<Vec<ValsetMember>>,
}

impl NullRegistry {
    pub fn new(members: Vec<ValsetMember>) -> Self {
        Self {
            members: Mutex::new(members),
        }
    }

    /// Convenience constructor from `(name, power)` pairs; names get the
    /// `grav1` prefix.
    pub fn with_powers(powers: &[(&str, u64)]) -> Self {
        Self::new(
            powers
                .iter()
                .map(|(name, power)| {
                    ValsetMember::new(AccountAddress::new(format!("grav1{name}")), *power)
                })
                .collect(),
        )
    }

    pub fn set_members(&self, members: Vec<ValsetMember>) {
        *self.members.lock().unwrap() = members;
    }

    /// Set one validator's power, adding it if absent and removing it at zero.
    pub fn set_power(&self, validator: &AccountAddress, power: u64) {
        let mut members = self.members.lock().unwrap();
        members.retain(|m| &m.validator != validator);
        if power > 0 {
            members.push(ValsetMember::new(validator.clone(), power));
        }
    }
}

impl MembershipRegistry for NullRegistry {
    fn current_members(&self) -> Vec<ValsetMember> {
        self.members.lock().unwrap().clone()
    }
}
