//! Fundamental types for the gravity bridge attestation engine.
//!
//! This crate defines the records shared across every other crate in the
//! workspace: addresses, content hashes, timestamps, claims, attestations,
//! outgoing batches and logic calls, validator sets, confirmations and the
//! bridge parameters.

pub mod address;
pub mod attestation;
pub mod claim;
pub mod confirm;
pub mod error;
pub mod event;
pub mod hash;
pub mod outgoing;
pub mod params;
pub mod registry;
pub mod time;
pub mod valset;

pub use address::{AccountAddress, EthAddress};
pub use attestation::{ApplyFailure, Attestation};
pub use claim::{Claim, ClaimPayload, ClaimType};
pub use confirm::{ConfirmSubject, Confirmation};
pub use error::TypesError;
pub use event::{BridgeEvent, EventSink};
pub use hash::ContentHash;
pub use outgoing::{
    BatchStatus, LogicCallStatus, OutgoingBatch, OutgoingLogicCall, OutgoingTransfer,
};
pub use params::{BridgeParams, Quorum};
pub use registry::MembershipRegistry;
pub use time::Timestamp;
pub use valset::{Valset, ValsetMember};
