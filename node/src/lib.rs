//! Gravity bridge node: hosts the attestation engine.
//!
//! The node is the coordinator that:
//! - Loads configuration and the genesis validator set
//! - Registers validator delegate keys for confirmation checks
//! - Turns JSON commands into engine operations
//! - Publishes the resulting bridge events to subscribers

pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod node;
pub mod spans;

pub use command::{ClaimInput, Command, MemberInput, SubjectInput, TriggerInput};
pub use config::{NodeConfig, ValidatorEntry};
pub use error::NodeError;
pub use events::EventBus;
pub use logging::{init_logging, LogFormat};
pub use node::BridgeNode;
