//! The bridge node: wires configuration, the staking registry, delegate
//! keys, storage and the event bus around one [`BridgeEngine`].

use std::sync::Arc;

use tracing::{debug, info};

use gravity_engine::{BridgeEngine, ClaimStatus, Outcome};
use gravity_nullables::{NullRegistry, NullStore};
use gravity_types::{BridgeEvent, BridgeParams, Claim, Timestamp};

use crate::command::{self, Command};
use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::events::EventBus;
use crate::spans;

/// A running bridge node.
///
/// Commands are handled one at a time; every event the engine produces is
/// published on the bus before [`BridgeNode::handle`] returns.
pub struct BridgeNode {
    pub config: NodeConfig,
    engine: BridgeEngine,
    /// Live staking view; `set_power` commands update it.
    registry: Arc<NullRegistry>,
    store: Arc<NullStore>,
    bus: EventBus,
    handled: u64,
}

impl BridgeNode {
    /// Build the node and publish the genesis valset event.
    pub fn new(config: NodeConfig, bus: EventBus, now: Timestamp) -> Result<Self, NodeError> {
        let params = config.bridge_params()?;
        let members = config.members()?;
        if members.is_empty() {
            return Err(NodeError::Config("no validators configured".into()));
        }
        let directory = config.key_directory()?;
        info!(
            validators = members.len(),
            delegate_keys = directory.len(),
            "loaded validator set"
        );

        let registry = Arc::new(NullRegistry::new(members));
        let store = Arc::new(NullStore::new());
        let Outcome {
            value: engine,
            events,
        } = BridgeEngine::new(
            params,
            registry.clone(),
            Arc::new(directory),
            store.clone(),
            now,
        )?;

        let node = Self {
            config,
            engine,
            registry,
            store,
            bus,
            handled: 0,
        };
        node.publish(&events);
        Ok(node)
    }

    pub fn engine(&self) -> &BridgeEngine {
        &self.engine
    }

    pub fn params(&self) -> &BridgeParams {
        self.engine.params()
    }

    pub fn store(&self) -> &NullStore {
        &self.store
    }

    /// Number of commands handled so far, accepted or not.
    pub fn handled(&self) -> u64 {
        self.handled
    }

    /// Parse and handle one JSON command line.
    pub fn handle_line(&mut self, line: &str) -> Result<Vec<BridgeEvent>, NodeError> {
        let command = Command::from_json(line)?;
        self.handle(command)
    }

    /// Handle one command, publishing and returning the events it produced.
    pub fn handle(&mut self, command: Command) -> Result<Vec<BridgeEvent>, NodeError> {
        self.handled += 1;
        let span = spans::command_span(command.op(), self.handled);
        let _guard = span.enter();

        let events = self.dispatch(command)?;
        self.publish(&events);
        Ok(events)
    }

    fn dispatch(&mut self, command: Command) -> Result<Vec<BridgeEvent>, NodeError> {
        match command {
            Command::Claim {
                event_nonce,
                claimant,
                at,
                payload,
            } => {
                let _claim = spans::claim_span(event_nonce, &claimant).entered();
                let claim = Claim::new(
                    event_nonce,
                    command::account(&claimant)?,
                    payload.into_payload()?,
                    Timestamp::new(at),
                );
                let outcome = self.engine.submit_claim(claim)?;
                let receipt = &outcome.value;
                match receipt.status {
                    ClaimStatus::Ignored => debug!("claim ignored"),
                    ClaimStatus::Recorded => debug!(attestation = %receipt.attestation_id, "claim recorded"),
                    ClaimStatus::Observed => info!(
                        attestation = %receipt.attestation_id,
                        applied = receipt.applied.len(),
                        "attestation observed"
                    ),
                }
                Ok(outcome.events)
            }
            Command::AddTransfer {
                sender,
                destination,
                amount,
                fee,
                at,
            } => {
                let outcome = self.engine.add_transfer(
                    command::account(&sender)?,
                    command::eth(&destination)?,
                    command::amount_of(&amount)?,
                    command::amount_of(&fee)?,
                    Timestamp::new(at),
                )?;
                debug!(transfer_id = outcome.value, "transfer pooled");
                Ok(outcome.events)
            }
            Command::CancelTransfer { id, requester } => {
                let outcome = self
                    .engine
                    .cancel_transfer(id, &command::account(&requester)?)?;
                Ok(outcome.events)
            }
            Command::BuildBatch {
                max_size,
                max_tx_age_secs,
                at,
            } => {
                let max_size = max_size.unwrap_or(self.config.batch_max_size);
                let max_age = max_tx_age_secs.unwrap_or(self.config.batch_max_tx_age_secs);
                let outcome = self
                    .engine
                    .build_batch(max_size, max_age, Timestamp::new(at))?;
                info!(
                    batch_nonce = outcome.value.batch_nonce,
                    transfers = outcome.value.transfers.len(),
                    "batch built"
                );
                Ok(outcome.events)
            }
            Command::RequestValsetUpdate {
                trigger,
                requester,
                at,
            } => {
                let trigger = trigger.into_trigger(requester.as_deref())?;
                let outcome = self
                    .engine
                    .request_valset_update(trigger, Timestamp::new(at))?;
                if outcome.value.is_none() {
                    debug!("valset update not needed");
                }
                Ok(outcome.events)
            }
            Command::EndBlock { at } => Ok(self.engine.end_block(Timestamp::new(at))?.events),
            Command::SubmitLogicCall {
                invalidation_id,
                invalidation_nonce,
                target,
                payload,
                timeout,
                requester,
                at,
            } => {
                let request = command::logic_call_request(
                    &invalidation_id,
                    invalidation_nonce,
                    &target,
                    &payload,
                    timeout,
                )?;
                let outcome = self.engine.submit_logic_call(
                    request,
                    &command::account(&requester)?,
                    Timestamp::new(at),
                )?;
                Ok(outcome.events)
            }
            Command::Confirm {
                subject,
                confirmer,
                proof,
            } => {
                let subject = subject.into_subject()?;
                let _confirm = spans::confirm_span(&subject.to_string(), &confirmer).entered();
                let confirmer = command::account(&confirmer)?;
                self.engine
                    .confirm(subject.clone(), confirmer, command::bytes(&proof)?)?;
                if self.engine.is_relay_ready(&subject) {
                    info!(%subject, "relay ready");
                }
                Ok(Vec::new())
            }
            Command::CancelBatch {
                batch_nonce,
                requester,
            } => {
                let outcome = self
                    .engine
                    .cancel_batch(batch_nonce, &command::account(&requester)?)?;
                Ok(outcome.events)
            }
            Command::CancelLogicCall {
                invalidation_id,
                invalidation_nonce,
                requester,
            } => {
                let outcome = self.engine.cancel_logic_call(
                    &command::bytes(&invalidation_id)?,
                    invalidation_nonce,
                    &command::account(&requester)?,
                )?;
                Ok(outcome.events)
            }
            Command::SetPower { validator, power } => {
                let validator = command::account(&validator)?;
                self.registry.set_power(&validator, power);
                info!(%validator, power, "voting power changed");
                Ok(Vec::new())
            }
        }
    }

    fn publish(&self, events: &[BridgeEvent]) {
        for event in events {
            self.bus.emit(event);
        }
    }
}
