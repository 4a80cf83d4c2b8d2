//! Abstract storage traits for the gravity bridge engine.
//!
//! The engine keeps its working state in memory and writes every committed
//! record through these traits. Any durable backend (or the in-memory
//! nullable used in tests) implements them; the engine depends only on the
//! traits.

pub mod attestation;
pub mod claim;
pub mod confirmation;
pub mod error;
pub mod meta;
pub mod outgoing;
pub mod valset;

pub use attestation::AttestationStore;
pub use claim::ClaimStore;
pub use confirmation::ConfirmationStore;
pub use error::StoreError;
pub use meta::MetaStore;
pub use outgoing::OutgoingStore;
pub use valset::ValsetStore;

/// Everything the engine persists, as one object-safe bound.
pub trait BridgeStore:
    ClaimStore + AttestationStore + OutgoingStore + ValsetStore + ConfirmationStore + MetaStore
{
}

impl<T> BridgeStore for T where
    T: ClaimStore + AttestationStore + OutgoingStore + ValsetStore + ConfirmationStore + MetaStore
{
}
