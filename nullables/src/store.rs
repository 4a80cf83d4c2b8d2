//! Nullable store: thread-safe in-memory storage for testing.
//!
//! Records are kept as bincode bytes, like a real key-value backend, so
//! serialization problems surface in tests too.

use gravity_store::{
    AttestationStore, ClaimStore, ConfirmationStore, MetaStore, OutgoingStore, StoreError,
    ValsetStore,
};
use gravity_types::{
    AccountAddress, ApplyFailure, Attestation, Claim, ConfirmSubject, Confirmation, ContentHash,
    EthAddress, OutgoingBatch, OutgoingLogicCall, OutgoingTransfer, Valset,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

type Bytes = Vec<u8>;

/// An in-memory bridge store.
#[derive(Default)]
pub struct NullStore {
    claims: Mutex<BTreeMap<(AccountAddress, u64), Bytes>>,
    attestations: Mutex<BTreeMap<ContentHash, Bytes>>,
    failures: Mutex<BTreeMap<u64, Bytes>>,
    transfers: Mutex<BTreeMap<u64, Bytes>>,
    batches: Mutex<BTreeMap<u64, Bytes>>,
    logic_calls: Mutex<BTreeMap<(Vec<u8>, u64), Bytes>>,
    valsets: Mutex<BTreeMap<u64, Bytes>>,
    confirmations: Mutex<BTreeMap<ConfirmSubject, Vec<Bytes>>>,
    last_observed_nonce: Mutex<u64>,
    balances: Mutex<BTreeMap<(AccountAddress, EthAddress), u128>>,
    fail_writes: AtomicBool,
    failing_ops: Mutex<BTreeSet<&'static str>>,
    writes_left: Mutex<Option<usize>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a backend error. Turning it off
    /// also clears [`fail_write`](Self::fail_write) and
    /// [`fail_after`](Self::fail_after).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
        if !fail {
            self.failing_ops.lock().unwrap().clear();
            *self.writes_left.lock().unwrap() = None;
        }
    }

    /// Make one write method, by name (e.g. `"put_balance"`), fail.
    pub fn fail_write(&self, op: &'static str) {
        self.failing_ops.lock().unwrap().insert(op);
    }

    /// Let `writes` more writes succeed, then fail every write after them.
    pub fn fail_after(&self, writes: usize) {
        *self.writes_left.lock().unwrap() = Some(writes);
    }

    fn check_writable(&self, op: &'static str) -> Result<(), StoreError> {
        let disabled = self.fail_writes.load(Ordering::SeqCst)
            || self.failing_ops.lock().unwrap().contains(op);
        if disabled {
            return Err(StoreError::Backend(format!("{op}: writes disabled")));
        }
        match self.writes_left.lock().unwrap().as_mut() {
            Some(0) => Err(StoreError::Backend(format!("{op}: write budget spent"))),
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Apply failures recorded so far, by event nonce.
    pub fn apply_failures(&self) -> Vec<ApplyFailure> {
        self.failures
            .lock()
            .unwrap()
            .values()
            .filter_map(|b| decode(b).ok())
            .collect()
    }

    /// Ids of transfers currently in the unbatched pool.
    pub fn pooled_transfer_ids(&self) -> Vec<u64> {
        self.transfers.lock().unwrap().keys().copied().collect()
    }

    pub fn attestation_count(&self) -> usize {
        self.attestations.lock().unwrap().len()
    }

    pub fn logic_call(
        &self,
        invalidation_id: &[u8],
        invalidation_nonce: u64,
    ) -> Option<OutgoingLogicCall> {
        self.logic_calls
            .lock()
            .unwrap()
            .get(&(invalidation_id.to_vec(), invalidation_nonce))
            .and_then(|b| decode(b).ok())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Bytes, StoreError> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl ClaimStore for NullStore {
    fn put_claim(&self, claim: &Claim) -> Result<(), StoreError> {
        self.check_writable("put_claim")?;
        let bytes = encode(claim)?;
        self.claims
            .lock()
            .unwrap()
            .insert((claim.claimant.clone(), claim.event_nonce), bytes);
        Ok(())
    }

    fn get_claim(&self, claimant: &AccountAddress, event_nonce: u64) -> Result<Claim, StoreError> {
        let claims = self.claims.lock().unwrap();
        let bytes = claims
            .get(&(claimant.clone(), event_nonce))
            .ok_or_else(|| StoreError::NotFound(format!("claim {claimant}/{event_nonce}")))?;
        decode(bytes)
    }

    fn claim_count(&self) -> Result<u64, StoreError> {
        Ok(self.claims.lock().unwrap().len() as u64)
    }
}

impl AttestationStore for NullStore {
    fn put_attestation(&self, attestation: &Attestation) -> Result<(), StoreError> {
        self.check_writable("put_attestation")?;
        let bytes = encode(attestation)?;
        self.attestations
            .lock()
            .unwrap()
            .insert(attestation.id, bytes);
        Ok(())
    }

    fn get_attestation(&self, id: &ContentHash) -> Result<Attestation, StoreError> {
        let attestations = self.attestations.lock().unwrap();
        let bytes = attestations
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("attestation {id}")))?;
        decode(bytes)
    }

    fn delete_attestation(&self, id: &ContentHash) -> Result<(), StoreError> {
        self.check_writable("delete_attestation")?;
        self.attestations.lock().unwrap().remove(id);
        Ok(())
    }

    fn put_apply_failure(&self, failure: &ApplyFailure) -> Result<(), StoreError> {
        self.check_writable("put_apply_failure")?;
        let bytes = encode(failure)?;
        self.failures
            .lock()
            .unwrap()
            .insert(failure.event_nonce, bytes);
        Ok(())
    }
}

impl OutgoingStore for NullStore {
    fn put_transfer(&self, transfer: &OutgoingTransfer) -> Result<(), StoreError> {
        self.check_writable("put_transfer")?;
        let bytes = encode(transfer)?;
        self.transfers.lock().unwrap().insert(transfer.id, bytes);
        Ok(())
    }

    fn delete_transfer(&self, id: u64) -> Result<(), StoreError> {
        self.check_writable("delete_transfer")?;
        self.transfers.lock().unwrap().remove(&id);
        Ok(())
    }

    fn put_batch(&self, batch: &OutgoingBatch) -> Result<(), StoreError> {
        self.check_writable("put_batch")?;
        let bytes = encode(batch)?;
        self.batches.lock().unwrap().insert(batch.batch_nonce, bytes);
        Ok(())
    }

    fn get_batch(&self, batch_nonce: u64) -> Result<OutgoingBatch, StoreError> {
        let batches = self.batches.lock().unwrap();
        let bytes = batches
            .get(&batch_nonce)
            .ok_or_else(|| StoreError::NotFound(format!("batch {batch_nonce}")))?;
        decode(bytes)
    }

    fn put_logic_call(&self, call: &OutgoingLogicCall) -> Result<(), StoreError> {
        self.check_writable("put_logic_call")?;
        let bytes = encode(call)?;
        self.logic_calls
            .lock()
            .unwrap()
            .insert((call.invalidation_id.clone(), call.invalidation_nonce), bytes);
        Ok(())
    }
}

impl ValsetStore for NullStore {
    fn put_valset(&self, valset: &Valset) -> Result<(), StoreError> {
        self.check_writable("put_valset")?;
        let bytes = encode(valset)?;
        self.valsets.lock().unwrap().insert(valset.nonce, bytes);
        Ok(())
    }

    fn get_valset(&self, nonce: u64) -> Result<Valset, StoreError> {
        let valsets = self.valsets.lock().unwrap();
        let bytes = valsets
            .get(&nonce)
            .ok_or_else(|| StoreError::NotFound(format!("valset {nonce}")))?;
        decode(bytes)
    }

    fn latest_valset_nonce(&self) -> Result<Option<u64>, StoreError> {
        Ok(self.valsets.lock().unwrap().keys().next_back().copied())
    }
}

impl ConfirmationStore for NullStore {
    fn put_confirmation(&self, confirmation: &Confirmation) -> Result<(), StoreError> {
        self.check_writable("put_confirmation")?;
        let bytes = encode(confirmation)?;
        self.confirmations
            .lock()
            .unwrap()
            .entry(confirmation.subject.clone())
            .or_default()
            .push(bytes);
        Ok(())
    }

    fn get_confirmations(&self, subject: &ConfirmSubject) -> Result<Vec<Confirmation>, StoreError> {
        let confirmations = self.confirmations.lock().unwrap();
        confirmations
            .get(subject)
            .map(|list| list.iter().map(|b| decode(b)).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

impl MetaStore for NullStore {
    fn put_last_observed_nonce(&self, nonce: u64) -> Result<(), StoreError> {
        self.check_writable("put_last_observed_nonce")?;
        *self.last_observed_nonce.lock().unwrap() = nonce;
        Ok(())
    }

    fn last_observed_nonce(&self) -> Result<u64, StoreError> {
        Ok(*self.last_observed_nonce.lock().unwrap())
    }

    fn put_balance(
        &self,
        account: &AccountAddress,
        token: &EthAddress,
        amount: u128,
    ) -> Result<(), StoreError> {
        self.check_writable("put_balance")?;
        self.balances
            .lock()
            .unwrap()
            .insert((account.clone(), *token), amount);
        Ok(())
    }

    fn balance(&self, account: &AccountAddress, token: &EthAddress) -> Result<u128, StoreError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&(account.clone(), *token))
            .copied()
            .unwrap_or(0))
    }
}
