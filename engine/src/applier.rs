//! State applier: turns an observed attestation into its effect on bridge
//! state, exactly once per event nonce.
//!
//! Every apply runs in three steps. [`StateApplier::stage`] reads current
//! state and works out the change, [`StagedApply::persist`] writes it, and
//! [`StateApplier::commit`] installs it in memory and cannot fail. A check
//! failure during staging is a domain failure: it is recorded, logged and the
//! nonce still advances.

use crate::batch::{BatchBuilder, RelayPlan};
use crate::error::BridgeError;
use crate::logic_call::{LogicCallPool, LogicCallRelayPlan};
use crate::valset::ValsetManager;
use gravity_store::BridgeStore;
use gravity_types::event::{
    ATTR_ATTESTATION_TYPE, ATTR_BATCH_NONCE, ATTR_BRIDGE_CHAIN_ID, ATTR_CONTRACT, ATTR_NONCE,
    ATTR_VALSET_NONCE, EVENT_DEPOSIT_RECEIVED, EVENT_MULTISIG_UPDATE_REQUEST,
    EVENT_WITHDRAWAL_RECEIVED,
};
use gravity_types::{
    AccountAddress, ApplyFailure, Attestation, BridgeEvent, ClaimPayload, ClaimType, EthAddress,
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

/// Why an observed fact could not be applied.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error("deposit amount is zero")]
    ZeroAmount,

    #[error("balance of {account} in {token} would overflow")]
    BalanceOverflow {
        account: AccountAddress,
        token: EthAddress,
    },

    #[error("batch {0} does not exist")]
    UnknownBatch(u64),

    #[error("batch {0} is not pending")]
    BatchNotPending(u64),

    #[error("valset {0} was never created")]
    UnknownValset(u64),

    #[error("valset {0} members differ from the local snapshot")]
    ValsetMismatch(u64),

    #[error("logic call {invalidation_id}/{invalidation_nonce} does not exist")]
    UnknownLogicCall {
        invalidation_id: String,
        invalidation_nonce: u64,
    },

    #[error("logic call {invalidation_id}/{invalidation_nonce} is not pending")]
    LogicCallNotPending {
        invalidation_id: String,
        invalidation_nonce: u64,
    },
}

/// Engine components an apply may touch.
pub struct ApplyContext<'a> {
    pub batches: &'a mut BatchBuilder,
    pub logic_calls: &'a mut LogicCallPool,
    pub valsets: &'a ValsetManager,
}

pub struct StateApplier {
    bridge_contract: EthAddress,
    bridge_chain_id: u64,
    balances: BTreeMap<(AccountAddress, EthAddress), u128>,
    last_relayed_valset: u64,
    failures: Vec<ApplyFailure>,
}

impl StateApplier {
    pub fn new(bridge_contract: EthAddress, bridge_chain_id: u64) -> Self {
        Self {
            bridge_contract,
            bridge_chain_id,
            balances: BTreeMap::new(),
            last_relayed_valset: 0,
            failures: Vec::new(),
        }
    }

    pub fn balance(&self, account: &AccountAddress, token: &EthAddress) -> u128 {
        self.balances
            .get(&(account.clone(), *token))
            .copied()
            .unwrap_or(0)
    }

    /// Highest valset nonce the external chain is known to have installed.
    pub fn last_relayed_valset(&self) -> u64 {
        self.last_relayed_valset
    }

    pub fn failures(&self) -> &[ApplyFailure] {
        &self.failures
    }

    /// Apply one observed attestation: stage, persist, then commit.
    ///
    /// Domain failures are absorbed into an [`ApplyFailure`] record and yield
    /// no events; only backend errors are returned, and then nothing in
    /// memory has changed.
    pub fn apply<S: BridgeStore + ?Sized>(
        &mut self,
        store: &S,
        attestation: &Attestation,
        ctx: ApplyContext<'_>,
    ) -> Result<Vec<BridgeEvent>, BridgeError> {
        let staged = self.stage(attestation, &ctx);
        staged.persist(store)?;
        Ok(self.commit(staged, ctx))
    }

    /// Work out what applying `attestation` changes, reading state only.
    pub fn stage(&self, attestation: &Attestation, ctx: &ApplyContext<'_>) -> StagedApply {
        let effect = self.plan(attestation, ctx).unwrap_or_else(|reason| {
            Effect::Failed(ApplyFailure {
                event_nonce: attestation.event_nonce,
                attestation_id: attestation.id,
                claim_type: attestation.claim_type(),
                reason: reason.to_string(),
            })
        });
        StagedApply {
            event_nonce: attestation.event_nonce,
            claim_type: attestation.claim_type(),
            effect,
        }
    }

    fn plan(
        &self,
        attestation: &Attestation,
        ctx: &ApplyContext<'_>,
    ) -> Result<Effect, ApplyError> {
        match &attestation.payload {
            ClaimPayload::Deposit {
                token_contract,
                amount,
                receiver,
                ..
            } => {
                if *amount == 0 {
                    return Err(ApplyError::ZeroAmount);
                }
                let balance = self
                    .balance(receiver, token_contract)
                    .checked_add(*amount)
                    .ok_or_else(|| ApplyError::BalanceOverflow {
                        account: receiver.clone(),
                        token: *token_contract,
                    })?;
                Ok(Effect::Credit {
                    receiver: receiver.clone(),
                    token: *token_contract,
                    amount: *amount,
                    balance,
                })
            }
            ClaimPayload::Withdrawal { batch_nonce, .. } => ctx
                .batches
                .plan_relay(*batch_nonce)
                .map(Effect::BatchRelayed),
            ClaimPayload::ValsetUpdated {
                valset_nonce,
                members,
                ..
            } => match ctx.valsets.get(*valset_nonce) {
                None => Err(ApplyError::UnknownValset(*valset_nonce)),
                Some(vs) if !vs.same_members(members) => {
                    Err(ApplyError::ValsetMismatch(*valset_nonce))
                }
                Some(_) => Ok(Effect::ValsetRelayed(*valset_nonce)),
            },
            ClaimPayload::LogicCallExecuted {
                invalidation_id,
                invalidation_nonce,
                ..
            } => ctx
                .logic_calls
                .plan_relay(invalidation_id, *invalidation_nonce)
                .map(Effect::LogicCallRelayed),
        }
    }

    /// Install a persisted apply and return its events.
    pub fn commit(&mut self, staged: StagedApply, ctx: ApplyContext<'_>) -> Vec<BridgeEvent> {
        let nonce = staged.event_nonce;
        let claim_type = staged.claim_type;

        match staged.effect {
            Effect::Failed(failure) => {
                warn!(
                    event_nonce = nonce,
                    attestation_id = %failure.attestation_id,
                    %claim_type,
                    reason = %failure.reason,
                    "observed attestation could not be applied"
                );
                self.failures.push(failure);
                Vec::new()
            }
            Effect::Credit {
                receiver,
                token,
                amount,
                balance,
            } => {
                info!(
                    event_nonce = nonce,
                    %receiver,
                    %token,
                    amount,
                    "deposit credited"
                );
                self.balances.insert((receiver, token), balance);
                vec![BridgeEvent::new(EVENT_DEPOSIT_RECEIVED)
                    .attr(ATTR_ATTESTATION_TYPE, claim_type)
                    .attr(ATTR_NONCE, nonce)
                    .attr(ATTR_CONTRACT, self.bridge_contract)
                    .attr(ATTR_BRIDGE_CHAIN_ID, self.bridge_chain_id)]
            }
            Effect::BatchRelayed(plan) => {
                let batch_nonce = plan.batch_nonce();
                let mut events = ctx.batches.commit_relay(plan);
                events.push(
                    BridgeEvent::new(EVENT_WITHDRAWAL_RECEIVED)
                        .attr(ATTR_ATTESTATION_TYPE, claim_type)
                        .attr(ATTR_NONCE, nonce)
                        .attr(ATTR_CONTRACT, self.bridge_contract)
                        .attr(ATTR_BATCH_NONCE, batch_nonce),
                );
                events
            }
            Effect::ValsetRelayed(valset_nonce) => {
                self.last_relayed_valset = self.last_relayed_valset.max(valset_nonce);
                info!(event_nonce = nonce, valset_nonce, "valset installed on external chain");
                vec![BridgeEvent::new(EVENT_MULTISIG_UPDATE_REQUEST)
                    .attr(ATTR_ATTESTATION_TYPE, claim_type)
                    .attr(ATTR_NONCE, nonce)
                    .attr(ATTR_VALSET_NONCE, valset_nonce)
                    .attr(ATTR_CONTRACT, self.bridge_contract)]
            }
            // No event of its own; only superseded calls are announced.
            Effect::LogicCallRelayed(plan) => ctx.logic_calls.commit_relay(plan),
        }
    }
}

/// The outcome of staging one attestation: the records to write and the
/// in-memory change to make once they are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedApply {
    event_nonce: u64,
    claim_type: ClaimType,
    effect: Effect,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Effect {
    Failed(ApplyFailure),
    Credit {
        receiver: AccountAddress,
        token: EthAddress,
        amount: u128,
        balance: u128,
    },
    BatchRelayed(RelayPlan),
    ValsetRelayed(u64),
    LogicCallRelayed(LogicCallRelayPlan),
}

impl StagedApply {
    pub fn event_nonce(&self) -> u64 {
        self.event_nonce
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.effect, Effect::Failed(_))
    }

    /// Write every record the apply changes. Each write stores an absolute
    /// value, so repeating a partly failed persist converges.
    pub fn persist<S: BridgeStore + ?Sized>(&self, store: &S) -> Result<(), BridgeError> {
        match &self.effect {
            Effect::Failed(failure) => store.put_apply_failure(failure)?,
            Effect::Credit {
                receiver,
                token,
                balance,
                ..
            } => store.put_balance(receiver, token, *balance)?,
            Effect::BatchRelayed(plan) => plan.persist(store)?,
            Effect::ValsetRelayed(_) => {}
            Effect::LogicCallRelayed(plan) => plan.persist(store)?,
        }
        Ok(())
    }
}
