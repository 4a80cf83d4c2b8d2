//! Bridge parameters shared by every engine component.

use crate::{AccountAddress, EthAddress, TypesError};
use serde::{Deserialize, Serialize};

/// A voting-power fraction, `numerator / denominator`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quorum {
    pub numerator: u64,
    pub denominator: u64,
}

impl Quorum {
    pub const TWO_THIRDS: Self = Self {
        numerator: 2,
        denominator: 3,
    };

    pub fn new(numerator: u64, denominator: u64) -> Result<Self, TypesError> {
        if denominator == 0 || numerator > denominator {
            return Err(TypesError::InvalidQuorum {
                numerator,
                denominator,
            });
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// `power / total` strictly greater than the fraction. Used for
    /// attestation observation.
    pub fn exceeded_by(&self, power: u64, total: u64) -> bool {
        total > 0
            && (power as u128) * (self.denominator as u128)
                > (total as u128) * (self.numerator as u128)
    }

    /// `power / total` at least the fraction. Used for relay readiness.
    pub fn reached_by(&self, power: u64, total: u64) -> bool {
        total > 0
            && (power as u128) * (self.denominator as u128)
                >= (total as u128) * (self.numerator as u128)
    }
}

impl Default for Quorum {
    fn default() -> Self {
        Self::TWO_THIRDS
    }
}

/// Parameters of one bridge deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeParams {
    /// Bridge contract on the external chain.
    pub bridge_contract: EthAddress,
    pub bridge_chain_id: u64,
    /// Account allowed to cancel any subject and request valset updates.
    pub governance: AccountAddress,
    pub quorum: Quorum,
    /// Claims further than this beyond the last observed nonce are refused.
    pub nonce_window: u64,
    pub batch_max_size: usize,
    /// Transfers older than this are not picked for new batches.
    pub batch_max_tx_age_secs: u64,
    /// Normalized power drift, in basis points, that forces a new valset.
    pub power_drift_bps: u64,
    /// Periodic valset interval; zero disables it.
    pub valset_interval_secs: u64,
}

impl Default for BridgeParams {
    fn default() -> Self {
        Self {
            bridge_contract: EthAddress::ZERO,
            bridge_chain_id: 1,
            governance: AccountAddress::new("grav1governance"),
            quorum: Quorum::TWO_THIRDS,
            nonce_window: 10_000,
            batch_max_size: 100,
            batch_max_tx_age_secs: 86_400,
            power_drift_bps: 500,
            valset_interval_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_thirds_strict_threshold() {
        let q = Quorum::TWO_THIRDS;
        assert!(q.exceeded_by(67, 100));
        assert!(!q.exceeded_by(66, 100));
        // Exactly two thirds does not exceed, but does reach.
        assert!(!q.exceeded_by(2, 3));
        assert!(q.reached_by(2, 3));
    }

    #[test]
    fn empty_power_never_reaches_quorum() {
        let q = Quorum::TWO_THIRDS;
        assert!(!q.exceeded_by(0, 0));
        assert!(!q.reached_by(0, 0));
    }

    #[test]
    fn invalid_fractions_rejected() {
        assert!(Quorum::new(1, 0).is_err());
        assert!(Quorum::new(4, 3).is_err());
        assert_eq!(Quorum::new(2, 3), Ok(Quorum::TWO_THIRDS));
    }

    #[test]
    fn no_overflow_at_extremes() {
        let q = Quorum::TWO_THIRDS;
        assert!(q.exceeded_by(u64::MAX, u64::MAX));
    }
}
