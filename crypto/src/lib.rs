//! Cryptographic primitives for the gravity bridge engine.
//!
//! - **Blake2b-256** for attestation ids and confirmation checkpoints
//! - **Ed25519** for validator confirmation signatures
//! - A delegate key directory implementing [`ProofVerifier`]

pub mod checkpoint;
pub mod directory;
pub mod hash;
pub mod keys;
pub mod sign;

pub use checkpoint::{attestation_id, batch_checkpoint, logic_call_checkpoint, valset_checkpoint};
pub use directory::{DirectoryError, KeyDirectory, ProofVerifier};
pub use hash::{blake2b_256, blake2b_256_multi};
pub use keys::{keypair_from_seed, KeyPair, PrivateKey, PublicKey, Signature};
pub use sign::{sign_message, verify_signature};
