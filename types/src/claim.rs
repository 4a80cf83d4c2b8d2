//! Claims: one validator's assertion about an event on the external chain.

use crate::{AccountAddress, EthAddress, Timestamp, ValsetMember};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of external event a claim describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClaimType {
    /// Tokens were locked in the bridge contract for a home-chain receiver.
    Deposit,
    /// An outgoing batch was executed by the bridge contract.
    Withdrawal,
    /// The bridge contract installed a new validator set.
    ValsetUpdated,
    /// A privileged logic call was executed by the bridge contract.
    LogicCallExecuted,
}

impl ClaimType {
    /// Name used in the `attestation_type` event attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::ValsetUpdated => "valset_updated",
            Self::LogicCallExecuted => "logic_call_executed",
        }
    }

    /// Stable one-byte tag mixed into the attestation id.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Deposit => 1,
            Self::Withdrawal => 2,
            Self::ValsetUpdated => 3,
            Self::LogicCallExecuted => 4,
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event-specific fields of a claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimPayload {
    Deposit {
        token_contract: EthAddress,
        amount: u128,
        sender: EthAddress,
        receiver: AccountAddress,
        block_height: u64,
    },
    Withdrawal {
        batch_nonce: u64,
        block_height: u64,
    },
    ValsetUpdated {
        valset_nonce: u64,
        members: Vec<ValsetMember>,
        block_height: u64,
    },
    LogicCallExecuted {
        invalidation_id: Vec<u8>,
        invalidation_nonce: u64,
        block_height: u64,
    },
}

impl ClaimPayload {
    pub fn claim_type(&self) -> ClaimType {
        match self {
            Self::Deposit { .. } => ClaimType::Deposit,
            Self::Withdrawal { .. } => ClaimType::Withdrawal,
            Self::ValsetUpdated { .. } => ClaimType::ValsetUpdated,
            Self::LogicCallExecuted { .. } => ClaimType::LogicCallExecuted,
        }
    }

    /// External block height at which the event was emitted.
    pub fn block_height(&self) -> u64 {
        match self {
            Self::Deposit { block_height, .. }
            | Self::Withdrawal { block_height, .. }
            | Self::ValsetUpdated { block_height, .. }
            | Self::LogicCallExecuted { block_height, .. } => *block_height,
        }
    }
}

/// A single validator's claim. Immutable once recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Position of the event in the bridge contract's event stream.
    pub event_nonce: u64,
    /// The validator asserting the event.
    pub claimant: AccountAddress,
    pub payload: ClaimPayload,
    /// Logical time the claim was submitted.
    pub submitted_at: Timestamp,
}

impl Claim {
    pub fn new(
        event_nonce: u64,
        claimant: AccountAddress,
        payload: ClaimPayload,
        submitted_at: Timestamp,
    ) -> Self {
        Self {
            event_nonce,
            claimant,
            payload,
            submitted_at,
        }
    }

    pub fn claim_type(&self) -> ClaimType {
        self.payload.claim_type()
    }
}
