//! The bridge engine facade.
//!
//! [`BridgeEngine`] owns every component and is the only thing callers talk
//! to. Each operation validates completely before it touches state, writes
//! through the store, and returns the events it produced. Publishing those
//! events is the caller's concern.

use crate::applier::{ApplyContext, StateApplier};
use crate::attestation::{AttestationAggregator, RecordOutcome};
use crate::batch::BatchBuilder;
use crate::cancel::CancellationHandler;
use crate::claims::ClaimLedger;
use crate::confirm::{ConfirmationCollector, SubjectInfo};
use crate::error::BridgeError;
use crate::logic_call::{LogicCallPool, LogicCallRequest};
use crate::sequencer::Sequencer;
use crate::valset::{ValsetManager, ValsetTrigger};
use gravity_crypto::{attestation_id, ProofVerifier};
use gravity_store::BridgeStore;
use gravity_types::event::{ATTR_ATTESTATION_ID, EVENT_OBSERVATION};
use gravity_types::{
    AccountAddress, ApplyFailure, Attestation, BatchStatus, BridgeEvent, BridgeParams, Claim,
    ConfirmSubject, Confirmation, ContentHash, EthAddress, MembershipRegistry, OutgoingBatch,
    OutgoingLogicCall, OutgoingTransfer, Timestamp, Valset,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A value plus the events produced while computing it, in emission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome<T> {
    pub value: T,
    pub events: Vec<BridgeEvent>,
}

impl<T> Outcome<T> {
    fn new(value: T, events: Vec<BridgeEvent>) -> Self {
        Self { value, events }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimStatus {
    /// The nonce was already observed or finalized; nothing changed.
    Ignored,
    /// Recorded, attestation still below quorum.
    Recorded,
    /// This claim pushed its attestation over quorum.
    Observed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub attestation_id: ContentHash,
    pub status: ClaimStatus,
    /// Event nonces applied as a consequence of this claim. Empty for an
    /// observed claim whose apply hit a storage error; the attestation then
    /// stays queued for [`BridgeEngine::advance`].
    pub applied: Vec<u64>,
}

pub struct BridgeEngine {
    params: BridgeParams,
    registry: Arc<dyn MembershipRegistry + Send + Sync>,
    verifier: Arc<dyn ProofVerifier + Send + Sync>,
    store: Arc<dyn BridgeStore + Send + Sync>,

    claims: ClaimLedger,
    aggregator: AttestationAggregator,
    sequencer: Sequencer,
    applier: StateApplier,
    batches: BatchBuilder,
    logic_calls: LogicCallPool,
    valsets: ValsetManager,
    confirmations: ConfirmationCollector,
    cancellations: CancellationHandler,
}

impl BridgeEngine {
    /// Build an engine and its genesis valset from the registry's current
    /// membership. The genesis `multisig_update_request` is returned.
    pub fn new(
        params: BridgeParams,
        registry: Arc<dyn MembershipRegistry + Send + Sync>,
        verifier: Arc<dyn ProofVerifier + Send + Sync>,
        store: Arc<dyn BridgeStore + Send + Sync>,
        now: Timestamp,
    ) -> Result<Outcome<Self>, BridgeError> {
        let (valsets, genesis_event) =
            ValsetManager::genesis(&*store, &params, registry.current_members(), now)?;
        let engine = Self {
            claims: ClaimLedger::new(),
            aggregator: AttestationAggregator::new(params.quorum),
            sequencer: Sequencer::new(0),
            applier: StateApplier::new(params.bridge_contract, params.bridge_chain_id),
            batches: BatchBuilder::new(params.bridge_contract, params.bridge_chain_id),
            logic_calls: LogicCallPool::new(params.bridge_contract),
            valsets,
            confirmations: ConfirmationCollector::new(params.quorum),
            cancellations: CancellationHandler::new(params.governance.clone()),
            params,
            registry,
            verifier,
            store,
        };
        info!(
            bridge_contract = %engine.params.bridge_contract,
            bridge_chain_id = engine.params.bridge_chain_id,
            "bridge engine started"
        );
        Ok(Outcome::new(engine, vec![genesis_event]))
    }

    pub fn params(&self) -> &BridgeParams {
        &self.params
    }

    // ── Claims ────────────────────────────────────────────────────────

    /// Record a validator's claim, and apply whatever it makes applicable.
    pub fn submit_claim(&mut self, claim: Claim) -> Result<Outcome<ClaimReceipt>, BridgeError> {
        let is_member = self
            .registry
            .current_members()
            .iter()
            .any(|m| m.validator == claim.claimant && m.power > 0);
        if !is_member {
            return Err(BridgeError::UnknownClaimant(claim.claimant));
        }

        let nonce = claim.event_nonce;
        let last_observed = self.sequencer.last_observed();
        if nonce <= last_observed || self.aggregator.nonce_observed(nonce) {
            debug!(
                event_nonce = nonce,
                claimant = %claim.claimant,
                "claim for settled nonce ignored"
            );
            let receipt = ClaimReceipt {
                attestation_id: attestation_id(nonce, &claim.payload),
                status: ClaimStatus::Ignored,
                applied: Vec::new(),
            };
            return Ok(Outcome::new(receipt, Vec::new()));
        }
        if nonce > last_observed.saturating_add(self.params.nonce_window) {
            return Err(BridgeError::NonceWindowExceeded {
                event_nonce: nonce,
                last_observed,
                window: self.params.nonce_window,
            });
        }
        if self.claims.contains(nonce, &claim.claimant) {
            return Err(BridgeError::DuplicateClaim {
                claimant: claim.claimant,
                event_nonce: nonce,
            });
        }

        let (attestation, outcome) =
            self.aggregator.tally(&claim, &self.valsets, claim.submitted_at);
        self.store.put_claim(&claim)?;
        self.store.put_attestation(&attestation)?;
        self.aggregator.insert(attestation.clone(), outcome);
        self.claims.insert(claim);

        let observation =
            BridgeEvent::new(EVENT_OBSERVATION).attr(ATTR_ATTESTATION_ID, attestation.id.to_hex());
        let mut events = vec![observation];
        let mut receipt = ClaimReceipt {
            attestation_id: attestation.id,
            status: ClaimStatus::Recorded,
            applied: Vec::new(),
        };
        if outcome == RecordOutcome::Observed {
            receipt.status = ClaimStatus::Observed;
            self.sequencer.enqueue(attestation);
            receipt.applied = match self.drain_ready(&mut events) {
                Ok(applied) => applied,
                Err(error) => {
                    warn!(event_nonce = nonce, %error, "observed attestation left queued");
                    Vec::new()
                }
            };
        }
        Ok(Outcome::new(receipt, events))
    }

    /// Apply every observed attestation that is next in line. Returns the
    /// nonces applied.
    ///
    /// This is also how an apply that failed on a storage error is retried.
    pub fn advance(&mut self) -> Result<Outcome<Vec<u64>>, BridgeError> {
        let mut events = Vec::new();
        let applied = self.drain_ready(&mut events)?;
        Ok(Outcome::new(applied, events))
    }

    /// Errors only when nothing could be applied. A failure after at least
    /// one nonce went through stops the drain and keeps the rest queued.
    fn drain_ready(&mut self, events: &mut Vec<BridgeEvent>) -> Result<Vec<u64>, BridgeError> {
        let mut applied = Vec::new();
        while let Some(attestation) = self.sequencer.peek_next().cloned() {
            match self.apply_next(&attestation) {
                Ok(produced) => {
                    events.extend(produced);
                    applied.push(attestation.event_nonce);
                }
                Err(error) if applied.is_empty() => return Err(error),
                Err(error) => {
                    warn!(
                        event_nonce = attestation.event_nonce,
                        %error,
                        "apply stopped, later nonces stay queued"
                    );
                    break;
                }
            }
        }
        Ok(applied)
    }

    /// Apply the attestation at the head of the queue. Every store write for
    /// the nonce happens before any in-memory change, so an error leaves the
    /// engine as it was and the same attestation is staged again next time.
    fn apply_next(&mut self, attestation: &Attestation) -> Result<Vec<BridgeEvent>, BridgeError> {
        let nonce = attestation.event_nonce;
        let staged = self.applier.stage(
            attestation,
            &ApplyContext {
                batches: &mut self.batches,
                logic_calls: &mut self.logic_calls,
                valsets: &self.valsets,
            },
        );
        staged.persist(&*self.store)?;
        self.store.put_last_observed_nonce(nonce)?;
        for loser in self.aggregator.losers(nonce) {
            self.store.delete_attestation(&loser)?;
        }

        let ctx = ApplyContext {
            batches: &mut self.batches,
            logic_calls: &mut self.logic_calls,
            valsets: &self.valsets,
        };
        let events = self.applier.commit(staged, ctx);
        self.sequencer.pop_next();
        self.aggregator.finalize(nonce);
        self.claims.prune_through(nonce);
        info!(
            event_nonce = nonce,
            claim_type = %attestation.claim_type(),
            "event nonce applied"
        );
        Ok(events)
    }

    // ── Outgoing transfers and batches ────────────────────────────────

    pub fn add_transfer(
        &mut self,
        sender: AccountAddress,
        destination: EthAddress,
        amount: u128,
        fee: u128,
        now: Timestamp,
    ) -> Result<Outcome<u64>, BridgeError> {
        let id = self
            .batches
            .add_transfer(&*self.store, sender, destination, amount, fee, now)?;
        Ok(Outcome::new(id, Vec::new()))
    }

    pub fn cancel_transfer(
        &mut self,
        id: u64,
        requester: &AccountAddress,
    ) -> Result<Outcome<OutgoingTransfer>, BridgeError> {
        let (transfer, event) = self.batches.cancel_transfer(&*self.store, id, requester)?;
        Ok(Outcome::new(transfer, vec![event]))
    }

    /// Cut a batch, weighed by the latest valset.
    pub fn build_batch(
        &mut self,
        max_size: usize,
        max_tx_age_secs: u64,
        now: Timestamp,
    ) -> Result<Outcome<OutgoingBatch>, BridgeError> {
        let valset_nonce = self.valsets.latest_nonce();
        let (batch, event) = self.batches.build_batch(
            &*self.store,
            max_size,
            max_tx_age_secs,
            now,
            valset_nonce,
        )?;
        Ok(Outcome::new(batch, vec![event]))
    }

    // ── Valsets ───────────────────────────────────────────────────────

    pub fn request_valset_update(
        &mut self,
        trigger: ValsetTrigger,
        now: Timestamp,
    ) -> Result<Outcome<Option<Valset>>, BridgeError> {
        let members = self.registry.current_members();
        let created = self
            .valsets
            .request_update(&*self.store, trigger, members, now)?;
        Ok(match created {
            Some((valset, event)) => Outcome::new(Some(valset), vec![event]),
            None => Outcome::new(None, Vec::new()),
        })
    }

    /// Per-block housekeeping: drift and periodic valset checks.
    pub fn end_block(&mut self, now: Timestamp) -> Result<Outcome<()>, BridgeError> {
        let members = self.registry.current_members();
        let events = self.valsets.end_block(&*self.store, members, now)?;
        Ok(Outcome::new((), events))
    }

    // ── Logic calls ───────────────────────────────────────────────────

    /// Create a pending logic call. Governance only.
    pub fn submit_logic_call(
        &mut self,
        request: LogicCallRequest,
        requester: &AccountAddress,
        now: Timestamp,
    ) -> Result<Outcome<OutgoingLogicCall>, BridgeError> {
        if requester != &self.params.governance {
            return Err(BridgeError::Unauthorized {
                requester: requester.clone(),
                action: "submit a logic call",
            });
        }
        let valset_nonce = self.valsets.latest_nonce();
        let call = self.logic_calls.submit(
            &*self.store,
            request,
            requester.clone(),
            now,
            valset_nonce,
        )?;
        Ok(Outcome::new(call, Vec::new()))
    }

    // ── Confirmations ─────────────────────────────────────────────────

    pub fn confirm(
        &mut self,
        subject: ConfirmSubject,
        confirmer: AccountAddress,
        proof: Vec<u8>,
    ) -> Result<(), BridgeError> {
        let info = self.subject_info(&subject);
        self.confirmations.confirm(
            &*self.store,
            &*self.verifier,
            subject,
            info,
            confirmer,
            proof,
        )
    }

    pub fn is_relay_ready(&self, subject: &ConfirmSubject) -> bool {
        self.confirmations
            .is_relay_ready(subject, self.subject_info(subject), &self.valsets)
    }

    pub fn confirmations(&self, subject: &ConfirmSubject) -> Vec<&Confirmation> {
        self.confirmations.confirmations(subject)
    }

    /// Checkpoint, weighing valset and status of a subject, if it exists.
    pub fn subject_info(&self, subject: &ConfirmSubject) -> Option<SubjectInfo> {
        match subject {
            ConfirmSubject::Batch(nonce) => self.batches.batch(*nonce).map(|b| SubjectInfo {
                checkpoint: b.checkpoint,
                valset_nonce: b.valset_nonce,
                status: b.status,
            }),
            ConfirmSubject::Valset(nonce) => self.valsets.get(*nonce).map(|vs| SubjectInfo {
                checkpoint: vs.checkpoint,
                valset_nonce: ValsetManager::signing_valset_for(vs.nonce),
                status: if vs.nonce <= self.applier.last_relayed_valset() {
                    BatchStatus::Relayed
                } else {
                    BatchStatus::Pending
                },
            }),
            ConfirmSubject::LogicCall {
                invalidation_id,
                invalidation_nonce,
            } => self
                .logic_calls
                .get(invalidation_id, *invalidation_nonce)
                .map(|c| SubjectInfo {
                    checkpoint: c.checkpoint,
                    valset_nonce: c.valset_nonce,
                    status: c.status,
                }),
        }
    }

    // ── Cancellation ──────────────────────────────────────────────────

    pub fn cancel_batch(
        &mut self,
        batch_nonce: u64,
        requester: &AccountAddress,
    ) -> Result<Outcome<()>, BridgeError> {
        let event = self.cancellations.cancel_batch(
            &*self.store,
            &mut self.batches,
            batch_nonce,
            requester,
        )?;
        Ok(Outcome::new((), vec![event]))
    }

    pub fn cancel_logic_call(
        &mut self,
        invalidation_id: &[u8],
        invalidation_nonce: u64,
        requester: &AccountAddress,
    ) -> Result<Outcome<()>, BridgeError> {
        let event = self.cancellations.cancel_logic_call(
            &*self.store,
            &mut self.logic_calls,
            invalidation_id,
            invalidation_nonce,
            requester,
        )?;
        Ok(Outcome::new((), vec![event]))
    }

    // ── Queries ───────────────────────────────────────────────────────

    pub fn last_observed_nonce(&self) -> u64 {
        self.sequencer.last_observed()
    }

    pub fn attestation(&self, id: &ContentHash) -> Option<&Attestation> {
        self.aggregator.get(id)
    }

    pub fn attestations_at(&self, event_nonce: u64) -> Vec<&Attestation> {
        self.aggregator.attestations_at(event_nonce).collect()
    }

    pub fn balance(&self, account: &AccountAddress, token: &EthAddress) -> u128 {
        self.applier.balance(account, token)
    }

    pub fn apply_failures(&self) -> &[ApplyFailure] {
        self.applier.failures()
    }

    pub fn batch(&self, batch_nonce: u64) -> Option<&OutgoingBatch> {
        self.batches.batch(batch_nonce)
    }

    pub fn pending_batches(&self) -> Vec<&OutgoingBatch> {
        self.batches.pending_batches().collect()
    }

    pub fn unbatched_transfers(&self) -> Vec<&OutgoingTransfer> {
        self.batches.unbatched().collect()
    }

    pub fn logic_call(
        &self,
        invalidation_id: &[u8],
        invalidation_nonce: u64,
    ) -> Option<&OutgoingLogicCall> {
        self.logic_calls.get(invalidation_id, invalidation_nonce)
    }

    pub fn valset(&self, nonce: u64) -> Option<&Valset> {
        self.valsets.get(nonce)
    }

    pub fn latest_valset(&self) -> &Valset {
        self.valsets.latest()
    }

    pub fn last_relayed_valset(&self) -> u64 {
        self.applier.last_relayed_valset()
    }
}
