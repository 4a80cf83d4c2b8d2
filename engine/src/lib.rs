//! Engine: attestation aggregation and outgoing batch consensus.
//!
//! Validators submit claims about events on the external chain. Identical
//! claims are aggregated into attestations; once an attestation carries more
//! than the quorum fraction of the pinned valset's power it is observed, and
//! observed attestations are applied strictly in event-nonce order. In the
//! other direction, outgoing transfers are cut into batches, valset updates
//! are snapshotted, and validators confirm both for relay.
//!
//! ## Module overview
//!
//! - [`claims`]: Per-`(nonce, claimant)` claim ledger.
//! - [`attestation`]: Claim aggregation, valset pinning and the quorum check.
//! - [`sequencer`]: Gap-free, in-order release of observed attestations.
//! - [`applier`]: Applies observed facts; records domain failures.
//! - [`batch`]: Unbatched transfer pool and outgoing batches.
//! - [`logic_call`]: Outgoing logic calls.
//! - [`valset`]: Append-only valset arena and update triggers.
//! - [`confirm`]: Confirmation collection and relay readiness.
//! - [`cancel`]: Batch and logic call cancellation.
//! - [`engine`]: [`BridgeEngine`], the facade wiring them together.
//! - [`error`]: Engine error types.

pub mod applier;
pub mod attestation;
pub mod batch;
pub mod cancel;
pub mod claims;
pub mod confirm;
pub mod engine;
pub mod error;
pub mod logic_call;
pub mod sequencer;
pub mod valset;

pub use applier::{ApplyContext, ApplyError, StagedApply, StateApplier};
pub use attestation::{AttestationAggregator, RecordOutcome};
pub use batch::{BatchBuilder, RelayPlan};
pub use cancel::CancellationHandler;
pub use claims::ClaimLedger;
pub use confirm::{ConfirmationCollector, SubjectInfo};
pub use engine::{BridgeEngine, ClaimReceipt, ClaimStatus, Outcome};
pub use error::BridgeError;
pub use logic_call::{LogicCallPool, LogicCallRelayPlan, LogicCallRequest};
pub use sequencer::Sequencer;
pub use valset::{ValsetManager, ValsetTrigger};
