//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the engine consumes (clock, durable storage, staking
//! registry, proof verification, event publication) is abstracted behind a
//! trait. This crate provides implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network

pub mod clock;
pub mod events;
pub mod registry;
pub mod store;
pub mod verifier;

pub use clock::NullClock;
pub use events::NullEventSink;
pub use registry::NullRegistry;
pub use store::NullStore;
pub use verifier::NullVerifier;
