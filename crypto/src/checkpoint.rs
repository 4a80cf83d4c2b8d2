//! Canonical digests of bridge records.
//!
//! Every digest is Blake2b-256 over a domain tag followed by the record's
//! fields in fixed order. Integers are big-endian; variable-length fields are
//! prefixed with their length so no two records share an encoding.

use crate::hash::blake2b_256;
use gravity_types::{
    AccountAddress, ClaimPayload, ContentHash, EthAddress, OutgoingTransfer, Valset, ValsetMember,
};

const ATTESTATION_DOMAIN: &[u8] = b"gravity/attestation/v1";
const BATCH_DOMAIN: &[u8] = b"gravity/batch/v1";
const VALSET_DOMAIN: &[u8] = b"gravity/valset/v1";
const LOGIC_CALL_DOMAIN: &[u8] = b"gravity/logic_call/v1";

struct Canonical(Vec<u8>);

impl Canonical {
    fn new(domain: &[u8]) -> Self {
        let mut enc = Self(Vec::with_capacity(256));
        enc.bytes(domain);
        enc
    }

    fn u8(&mut self, v: u8) -> &mut Self {
        self.0.push(v);
        self
    }

    fn u64(&mut self, v: u64) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn u128(&mut self, v: u128) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.u64(v.len() as u64);
        self.0.extend_from_slice(v);
        self
    }

    fn eth(&mut self, v: &EthAddress) -> &mut Self {
        self.0.extend_from_slice(v.as_bytes());
        self
    }

    fn account(&mut self, v: &AccountAddress) -> &mut Self {
        self.bytes(v.as_str().as_bytes())
    }

    fn members(&mut self, members: &[ValsetMember]) -> &mut Self {
        self.u64(members.len() as u64);
        for m in members {
            self.account(&m.validator).u64(m.power);
        }
        self
    }

    fn finish(&self) -> ContentHash {
        ContentHash::new(blake2b_256(&self.0))
    }
}

/// Attestation id: hash of `(event_nonce, claim_type, payload)`.
///
/// Claimant and submission time are excluded so that every validator
/// asserting the same fact lands on the same attestation.
pub fn attestation_id(event_nonce: u64, payload: &ClaimPayload) -> ContentHash {
    let mut enc = Canonical::new(ATTESTATION_DOMAIN);
    enc.u64(event_nonce).u8(payload.claim_type().tag());
    match payload {
        ClaimPayload::Deposit {
            token_contract,
            amount,
            sender,
            receiver,
            block_height,
        } => {
            enc.eth(token_contract)
                .u128(*amount)
                .eth(sender)
                .account(receiver)
                .u64(*block_height);
        }
        ClaimPayload::Withdrawal {
            batch_nonce,
            block_height,
        } => {
            enc.u64(*batch_nonce).u64(*block_height);
        }
        ClaimPayload::ValsetUpdated {
            valset_nonce,
            members,
            block_height,
        } => {
            let canon = Valset::canonical_members(members);
            enc.u64(*valset_nonce).members(&canon).u64(*block_height);
        }
        ClaimPayload::LogicCallExecuted {
            invalidation_id,
            invalidation_nonce,
            block_height,
        } => {
            enc.bytes(invalidation_id)
                .u64(*invalidation_nonce)
                .u64(*block_height);
        }
    }
    enc.finish()
}

/// Digest validators sign to authorize an outgoing batch.
pub fn batch_checkpoint(
    bridge_contract: &EthAddress,
    batch_nonce: u64,
    transfers: &[OutgoingTransfer],
) -> ContentHash {
    let mut enc = Canonical::new(BATCH_DOMAIN);
    enc.eth(bridge_contract)
        .u64(batch_nonce)
        .u64(transfers.len() as u64);
    for t in transfers {
        enc.u64(t.id).eth(&t.destination).u128(t.amount).u128(t.fee);
    }
    enc.finish()
}

/// Digest validators sign to authorize a validator set update.
pub fn valset_checkpoint(
    bridge_contract: &EthAddress,
    valset_nonce: u64,
    members: &[ValsetMember],
) -> ContentHash {
    let mut enc = Canonical::new(VALSET_DOMAIN);
    enc.eth(bridge_contract).u64(valset_nonce).members(members);
    enc.finish()
}

/// Digest validators sign to authorize a logic call.
pub fn logic_call_checkpoint(
    bridge_contract: &EthAddress,
    invalidation_id: &[u8],
    invalidation_nonce: u64,
    target: &EthAddress,
    payload: &[u8],
    timeout: u64,
) -> ContentHash {
    let mut enc = Canonical::new(LOGIC_CALL_DOMAIN);
    enc.eth(bridge_contract)
        .bytes(invalidation_id)
        .u64(invalidation_nonce)
        .eth(target)
        .bytes(payload)
        .u64(timeout);
    enc.finish()
}
