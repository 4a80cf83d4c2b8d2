//! Outgoing logic calls: privileged one-shot invocations on the external
//! chain, keyed by `(invalidation_id, invalidation_nonce)`.

use crate::applier::ApplyError;
use crate::error::BridgeError;
use gravity_crypto::logic_call_checkpoint;
use gravity_store::BridgeStore;
use gravity_types::event::{
    ATTR_INVALIDATION_ID, ATTR_INVALIDATION_NONCE, EVENT_OUTGOING_LOGIC_CALL_CANCELED,
};
use gravity_types::{
    AccountAddress, BatchStatus, BridgeEvent, ConfirmSubject, EthAddress, OutgoingLogicCall,
    Timestamp,
};
use std::collections::BTreeMap;
use tracing::info;

/// Caller-supplied contents of a new logic call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicCallRequest {
    pub invalidation_id: Vec<u8>,
    pub invalidation_nonce: u64,
    pub target: EthAddress,
    pub payload: Vec<u8>,
    pub timeout: u64,
}

type CallKey = (Vec<u8>, u64);

pub struct LogicCallPool {
    bridge_contract: EthAddress,
    calls: BTreeMap<CallKey, OutgoingLogicCall>,
}

impl LogicCallPool {
    pub fn new(bridge_contract: EthAddress) -> Self {
        Self {
            bridge_contract,
            calls: BTreeMap::new(),
        }
    }

    pub fn submit<S: BridgeStore + ?Sized>(
        &mut self,
        store: &S,
        request: LogicCallRequest,
        creator: AccountAddress,
        now: Timestamp,
        valset_nonce: u64,
    ) -> Result<OutgoingLogicCall, BridgeError> {
        let key = (request.invalidation_id.clone(), request.invalidation_nonce);
        if self.calls.contains_key(&key) {
            return Err(BridgeError::DuplicateSubject(ConfirmSubject::LogicCall {
                invalidation_id: key.0,
                invalidation_nonce: key.1,
            }));
        }
        let checkpoint = logic_call_checkpoint(
            &self.bridge_contract,
            &request.invalidation_id,
            request.invalidation_nonce,
            &request.target,
            &request.payload,
            request.timeout,
        );
        let call = OutgoingLogicCall {
            invalidation_id: request.invalidation_id,
            invalidation_nonce: request.invalidation_nonce,
            target: request.target,
            payload: request.payload,
            timeout: request.timeout,
            creator,
            created_at: now,
            valset_nonce,
            checkpoint,
            status: BatchStatus::Pending,
        };
        store.put_logic_call(&call)?;
        info!(
            invalidation_id = %hex::encode(&call.invalidation_id),
            invalidation_nonce = call.invalidation_nonce,
            valset_nonce,
            "logic call created"
        );
        self.calls.insert(key, call.clone());
        Ok(call)
    }

    pub fn get(
        &self,
        invalidation_id: &[u8],
        invalidation_nonce: u64,
    ) -> Option<&OutgoingLogicCall> {
        self.calls.get(&(invalidation_id.to_vec(), invalidation_nonce))
    }

    /// Work out what an observed execution of a call changes, without
    /// changing anything. Pending calls with the same invalidation id and a
    /// lower nonce are void on the external chain and get canceled.
    pub fn plan_relay(
        &self,
        invalidation_id: &[u8],
        invalidation_nonce: u64,
    ) -> Result<LogicCallRelayPlan, ApplyError> {
        let call = match self.get(invalidation_id, invalidation_nonce) {
            None => {
                return Err(ApplyError::UnknownLogicCall {
                    invalidation_id: hex::encode(invalidation_id),
                    invalidation_nonce,
                })
            }
            Some(call) if !call.is_pending() => {
                return Err(ApplyError::LogicCallNotPending {
                    invalidation_id: hex::encode(invalidation_id),
                    invalidation_nonce,
                })
            }
            Some(call) => call,
        };
        let superseded = self
            .calls
            .range((invalidation_id.to_vec(), 0)..(invalidation_id.to_vec(), invalidation_nonce))
            .filter(|(_, call)| call.is_pending())
            .map(|(_, call)| with_status(call, BatchStatus::Canceled))
            .collect();
        Ok(LogicCallRelayPlan {
            relayed: with_status(call, BatchStatus::Relayed),
            superseded,
        })
    }

    /// Install a persisted relay plan. Returns one cancel event per
    /// superseded call.
    pub fn commit_relay(&mut self, plan: LogicCallRelayPlan) -> Vec<BridgeEvent> {
        let events = plan
            .superseded
            .into_iter()
            .map(|call| self.commit_cancel(call))
            .collect();
        info!(
            invalidation_id = %hex::encode(&plan.relayed.invalidation_id),
            invalidation_nonce = plan.relayed.invalidation_nonce,
            "logic call relayed"
        );
        self.install(plan.relayed);
        events
    }

    /// Plan, persist and commit a relay in one step.
    pub fn mark_relayed<S: BridgeStore + ?Sized>(
        &mut self,
        store: &S,
        invalidation_id: &[u8],
        invalidation_nonce: u64,
    ) -> Result<Vec<BridgeEvent>, BridgeError> {
        let subject = ConfirmSubject::LogicCall {
            invalidation_id: invalidation_id.to_vec(),
            invalidation_nonce,
        };
        let plan = self
            .plan_relay(invalidation_id, invalidation_nonce)
            .map_err(|e| match e {
                ApplyError::UnknownLogicCall { .. } => BridgeError::UnknownSubject(subject),
                _ => BridgeError::NotPending(subject),
            })?;
        plan.persist(store)?;
        Ok(self.commit_relay(plan))
    }

    /// Cancel a pending call. Authorization and status checks are the
    /// caller's job.
    pub fn cancel<S: BridgeStore + ?Sized>(
        &mut self,
        store: &S,
        invalidation_id: &[u8],
        invalidation_nonce: u64,
    ) -> Result<BridgeEvent, BridgeError> {
        let call = self.get(invalidation_id, invalidation_nonce).ok_or_else(|| {
            BridgeError::UnknownSubject(ConfirmSubject::LogicCall {
                invalidation_id: invalidation_id.to_vec(),
                invalidation_nonce,
            })
        })?;
        let canceled = with_status(call, BatchStatus::Canceled);
        store.put_logic_call(&canceled)?;
        Ok(self.commit_cancel(canceled))
    }

    fn commit_cancel(&mut self, canceled: OutgoingLogicCall) -> BridgeEvent {
        let invalidation_id = hex::encode(&canceled.invalidation_id);
        let invalidation_nonce = canceled.invalidation_nonce;
        info!(
            invalidation_id = %invalidation_id,
            invalidation_nonce,
            "logic call canceled"
        );
        self.install(canceled);
        BridgeEvent::new(EVENT_OUTGOING_LOGIC_CALL_CANCELED)
            .attr(ATTR_INVALIDATION_ID, invalidation_id)
            .attr(ATTR_INVALIDATION_NONCE, invalidation_nonce)
    }

    fn install(&mut self, call: OutgoingLogicCall) {
        let key = (call.invalidation_id.clone(), call.invalidation_nonce);
        self.calls.insert(key, call);
    }
}

/// Logic call status changes caused by one observed execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicCallRelayPlan {
    relayed: OutgoingLogicCall,
    superseded: Vec<OutgoingLogicCall>,
}

impl LogicCallRelayPlan {
    /// Write every call the plan changes. Safe to repeat after a partial
    /// failure.
    pub fn persist<S: BridgeStore + ?Sized>(&self, store: &S) -> Result<(), BridgeError> {
        for call in &self.superseded {
            store.put_logic_call(call)?;
        }
        store.put_logic_call(&self.relayed)?;
        Ok(())
    }
}

fn with_status(call: &OutgoingLogicCall, status: BatchStatus) -> OutgoingLogicCall {
    let mut updated = call.clone();
    updated.status = status;
    updated
}
