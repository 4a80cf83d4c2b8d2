//! Outgoing transfers, batches and logic calls bound for the external chain.

use crate::{AccountAddress, ContentHash, EthAddress, Timestamp};
use serde::{Deserialize, Serialize};

/// A pending request to move value to the external chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingTransfer {
    pub id: u64,
    pub sender: AccountAddress,
    pub destination: EthAddress,
    pub amount: u128,
    pub fee: u128,
    pub created_at: Timestamp,
}

/// Relay status shared by batches and logic calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    /// Built and collecting confirmations.
    Pending,
    /// Execution on the external chain has been observed. Terminal.
    Relayed,
    /// Canceled before relay. Terminal.
    Canceled,
}

pub type LogicCallStatus = BatchStatus;

/// A nonce-tagged group of transfers relayed and confirmed together.
///
/// Contents never change after construction; only `status` moves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingBatch {
    pub batch_nonce: u64,
    pub transfers: Vec<OutgoingTransfer>,
    pub total_fee: u128,
    pub created_at: Timestamp,
    /// Valset active when the batch was built; decides relay quorum.
    pub valset_nonce: u64,
    /// Digest validators sign to confirm the batch.
    pub checkpoint: ContentHash,
    pub status: BatchStatus,
}

impl OutgoingBatch {
    pub fn is_pending(&self) -> bool {
        self.status == BatchStatus::Pending
    }

    pub fn transfer_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.transfers.iter().map(|t| t.id)
    }
}

/// A privileged one-shot invocation on the external chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingLogicCall {
    pub invalidation_id: Vec<u8>,
    pub invalidation_nonce: u64,
    pub target: EthAddress,
    pub payload: Vec<u8>,
    /// External block height after which the call is void on-chain.
    pub timeout: u64,
    pub creator: AccountAddress,
    pub created_at: Timestamp,
    pub valset_nonce: u64,
    pub checkpoint: ContentHash,
    pub status: LogicCallStatus,
}

impl OutgoingLogicCall {
    pub fn is_pending(&self) -> bool {
        self.status == BatchStatus::Pending
    }
}
