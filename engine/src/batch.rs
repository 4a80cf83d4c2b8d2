//! Outgoing batch builder: the unbatched transfer pool and the batches cut
//! from it.

use crate::applier::ApplyError;
use crate::error::BridgeError;
use gravity_crypto::batch_checkpoint;
use gravity_store::BridgeStore;
use gravity_types::event::{
    ATTR_BATCH_CONFIRM_KEY, ATTR_BATCH_NONCE, ATTR_BRIDGE_CHAIN_ID, ATTR_CONTRACT,
    ATTR_OUTGOING_BATCH_ID, ATTR_OUTGOING_TX_ID, EVENT_OUTGOING_BATCH,
    EVENT_OUTGOING_BATCH_CANCELED, EVENT_WITHDRAW_CANCELED,
};
use gravity_types::{
    AccountAddress, BatchStatus, BridgeEvent, ConfirmSubject, EthAddress, OutgoingBatch,
    OutgoingTransfer, Timestamp,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub struct BatchBuilder {
    bridge_contract: EthAddress,
    bridge_chain_id: u64,
    pool: BTreeMap<u64, OutgoingTransfer>,
    batches: BTreeMap<u64, OutgoingBatch>,
    last_transfer_id: u64,
    last_batch_nonce: u64,
}

impl BatchBuilder {
    pub fn new(bridge_contract: EthAddress, bridge_chain_id: u64) -> Self {
        Self {
            bridge_contract,
            bridge_chain_id,
            pool: BTreeMap::new(),
            batches: BTreeMap::new(),
            last_transfer_id: 0,
            last_batch_nonce: 0,
        }
    }

    /// Queue a transfer to the external chain. Returns its id.
    pub fn add_transfer<S: BridgeStore + ?Sized>(
        &mut self,
        store: &S,
        sender: AccountAddress,
        destination: EthAddress,
        amount: u128,
        fee: u128,
        now: Timestamp,
    ) -> Result<u64, BridgeError> {
        if amount == 0 {
            return Err(BridgeError::InvalidTransfer("amount must be positive"));
        }
        if destination == EthAddress::ZERO {
            return Err(BridgeError::InvalidTransfer("destination is the zero address"));
        }
        let transfer = OutgoingTransfer {
            id: self.last_transfer_id + 1,
            sender,
            destination,
            amount,
            fee,
            created_at: now,
        };
        store.put_transfer(&transfer)?;
        self.last_transfer_id = transfer.id;
        debug!(
            id = transfer.id,
            sender = %transfer.sender,
            amount,
            fee,
            "outgoing transfer queued"
        );
        self.pool.insert(transfer.id, transfer);
        Ok(self.last_transfer_id)
    }

    /// Withdraw an unbatched transfer. Only its sender may do so.
    pub fn cancel_transfer<S: BridgeStore + ?Sized>(
        &mut self,
        store: &S,
        id: u64,
        requester: &AccountAddress,
    ) -> Result<(OutgoingTransfer, BridgeEvent), BridgeError> {
        let Some(transfer) = self.pool.get(&id) else {
            let batched = self
                .batches
                .values()
                .any(|b| b.is_pending() && b.transfer_ids().any(|t| t == id));
            return Err(if batched {
                BridgeError::TransferBatched(id)
            } else {
                BridgeError::UnknownTransfer(id)
            });
        };
        if &transfer.sender != requester {
            return Err(BridgeError::Unauthorized {
                requester: requester.clone(),
                action: "cancel this transfer",
            });
        }
        store.delete_transfer(id)?;
        let transfer = self.pool.remove(&id).ok_or(BridgeError::UnknownTransfer(id))?;
        info!(id, sender = %transfer.sender, "outgoing transfer canceled");
        let event = BridgeEvent::new(EVENT_WITHDRAW_CANCELED).attr(ATTR_OUTGOING_TX_ID, id);
        Ok((transfer, event))
    }

    /// Cut a batch from the pool: transfers no older than `max_tx_age_secs`,
    /// highest fee first, then oldest, then lowest id, at most `max_size`.
    pub fn build_batch<S: BridgeStore + ?Sized>(
        &mut self,
        store: &S,
        max_size: usize,
        max_tx_age_secs: u64,
        now: Timestamp,
        valset_nonce: u64,
    ) -> Result<(OutgoingBatch, BridgeEvent), BridgeError> {
        let mut candidates: Vec<&OutgoingTransfer> = self
            .pool
            .values()
            .filter(|t| t.created_at.elapsed_since(now) <= max_tx_age_secs)
            .collect();
        candidates.sort_by(|a, b| {
            b.fee
                .cmp(&a.fee)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        candidates.truncate(max_size);
        if candidates.is_empty() {
            return Err(BridgeError::NothingToBatch);
        }

        let transfers: Vec<OutgoingTransfer> = candidates.into_iter().cloned().collect();
        let batch_nonce = self.last_batch_nonce + 1;
        let total_fee = transfers
            .iter()
            .fold(0u128, |acc, t| acc.saturating_add(t.fee));
        let checkpoint = batch_checkpoint(&self.bridge_contract, batch_nonce, &transfers);
        let batch = OutgoingBatch {
            batch_nonce,
            transfers,
            total_fee,
            created_at: now,
            valset_nonce,
            checkpoint,
            status: BatchStatus::Pending,
        };

        store.put_batch(&batch)?;
        for id in batch.transfer_ids() {
            store.delete_transfer(id)?;
        }
        for id in batch.transfer_ids() {
            self.pool.remove(&id);
        }
        self.last_batch_nonce = batch_nonce;
        self.batches.insert(batch_nonce, batch.clone());

        info!(
            batch_nonce,
            transfers = batch.transfers.len(),
            total_fee,
            valset_nonce,
            "outgoing batch built"
        );
        let event = BridgeEvent::new(EVENT_OUTGOING_BATCH)
            .attr(ATTR_BATCH_CONFIRM_KEY, checkpoint.to_hex())
            .attr(ATTR_BATCH_NONCE, batch_nonce)
            .attr(ATTR_CONTRACT, self.bridge_contract)
            .attr(ATTR_BRIDGE_CHAIN_ID, self.bridge_chain_id);
        Ok((batch, event))
    }

    /// Work out what an observed execution of `batch_nonce` changes,
    /// without changing anything.
    ///
    /// Every still-pending batch with a lower nonce can no longer execute on
    /// the external chain, so the plan cancels it and returns its transfers
    /// to the pool.
    pub fn plan_relay(&self, batch_nonce: u64) -> Result<RelayPlan, ApplyError> {
        let batch = match self.batches.get(&batch_nonce) {
            None => return Err(ApplyError::UnknownBatch(batch_nonce)),
            Some(b) if !b.is_pending() => return Err(ApplyError::BatchNotPending(batch_nonce)),
            Some(b) => b,
        };
        let superseded = self
            .batches
            .range(..batch_nonce)
            .filter(|(_, b)| b.is_pending())
            .map(|(_, b)| with_status(b, BatchStatus::Canceled))
            .collect();
        Ok(RelayPlan {
            relayed: with_status(batch, BatchStatus::Relayed),
            superseded,
        })
    }

    /// Install a persisted relay plan. Returns one cancel event per
    /// superseded batch.
    pub fn commit_relay(&mut self, plan: RelayPlan) -> Vec<BridgeEvent> {
        let events = plan
            .superseded
            .into_iter()
            .map(|batch| self.commit_cancel(batch))
            .collect();
        info!(batch_nonce = plan.relayed.batch_nonce, "outgoing batch relayed");
        self.batches.insert(plan.relayed.batch_nonce, plan.relayed);
        events
    }

    /// Plan, persist and commit a relay in one step.
    pub fn mark_relayed<S: BridgeStore + ?Sized>(
        &mut self,
        store: &S,
        batch_nonce: u64,
    ) -> Result<Vec<BridgeEvent>, BridgeError> {
        let subject = ConfirmSubject::Batch(batch_nonce);
        let plan = self.plan_relay(batch_nonce).map_err(|e| match e {
            ApplyError::UnknownBatch(_) => BridgeError::UnknownSubject(subject),
            _ => BridgeError::NotPending(subject),
        })?;
        plan.persist(store)?;
        Ok(self.commit_relay(plan))
    }

    /// Cancel a pending batch and return its transfers to the pool.
    /// Authorization and status checks are the caller's job.
    pub fn cancel<S: BridgeStore + ?Sized>(
        &mut self,
        store: &S,
        batch_nonce: u64,
    ) -> Result<BridgeEvent, BridgeError> {
        let batch = self
            .batches
            .get(&batch_nonce)
            .ok_or(BridgeError::UnknownSubject(ConfirmSubject::Batch(batch_nonce)))?;
        let canceled = with_status(batch, BatchStatus::Canceled);
        persist_canceled(store, &canceled)?;
        Ok(self.commit_cancel(canceled))
    }

    fn commit_cancel(&mut self, canceled: OutgoingBatch) -> BridgeEvent {
        let batch_nonce = canceled.batch_nonce;
        let ids: Vec<String> = canceled.transfer_ids().map(|id| id.to_string()).collect();
        for transfer in &canceled.transfers {
            self.pool.insert(transfer.id, transfer.clone());
        }
        self.batches.insert(batch_nonce, canceled);
        info!(batch_nonce, returned = ids.len(), "outgoing batch canceled");
        BridgeEvent::new(EVENT_OUTGOING_BATCH_CANCELED)
            .attr(ATTR_OUTGOING_BATCH_ID, batch_nonce)
            .attr(ATTR_BATCH_NONCE, batch_nonce)
            .attr(ATTR_CONTRACT, self.bridge_contract)
            .attr(ATTR_OUTGOING_TX_ID, ids.join(","))
    }

    pub fn batch(&self, batch_nonce: u64) -> Option<&OutgoingBatch> {
        self.batches.get(&batch_nonce)
    }

    pub fn pending_batches(&self) -> impl Iterator<Item = &OutgoingBatch> {
        self.batches.values().filter(|b| b.is_pending())
    }

    /// Transfers waiting to be batched, by id.
    pub fn unbatched(&self) -> impl Iterator<Item = &OutgoingTransfer> {
        self.pool.values()
    }

    pub fn is_unbatched(&self, id: u64) -> bool {
        self.pool.contains_key(&id)
    }

    pub fn last_batch_nonce(&self) -> u64 {
        self.last_batch_nonce
    }
}

/// Batch status changes caused by one observed execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayPlan {
    relayed: OutgoingBatch,
    superseded: Vec<OutgoingBatch>,
}

impl RelayPlan {
    pub fn batch_nonce(&self) -> u64 {
        self.relayed.batch_nonce
    }

    /// Nonces of the lower pending batches this relay cancels.
    pub fn superseded(&self) -> impl Iterator<Item = u64> + '_ {
        self.superseded.iter().map(|b| b.batch_nonce)
    }

    /// Write every record the plan changes. Each write stores a whole
    /// record, so a partly failed persist can simply be repeated.
    pub fn persist<S: BridgeStore + ?Sized>(&self, store: &S) -> Result<(), BridgeError> {
        for batch in &self.superseded {
            persist_canceled(store, batch)?;
        }
        store.put_batch(&self.relayed)?;
        Ok(())
    }
}

fn with_status(batch: &OutgoingBatch, status: BatchStatus) -> OutgoingBatch {
    let mut updated = batch.clone();
    updated.status = status;
    updated
}

fn persist_canceled<S: BridgeStore + ?Sized>(
    store: &S,
    canceled: &OutgoingBatch,
) -> Result<(), BridgeError> {
    store.put_batch(canceled)?;
    for transfer in &canceled.transfers {
        store.put_transfer(transfer)?;
    }
    Ok(())
}
