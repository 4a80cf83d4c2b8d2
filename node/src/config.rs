//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};

use gravity_crypto::{KeyDirectory, PublicKey};
use gravity_types::{AccountAddress, BridgeParams, EthAddress, Quorum, ValsetMember};

use crate::logging::LogFormat;
use crate::NodeError;

/// One bonded validator as seen by the staking registry at startup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorEntry {
    pub address: String,
    pub power: u64,
    /// Hex Ed25519 key that signs this validator's confirmations.
    #[serde(default)]
    pub delegate_key: Option<String>,
}

/// Configuration for a bridge node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Bridge contract on the external chain, `0x`-prefixed hex.
    #[serde(default = "default_bridge_contract")]
    pub bridge_contract: String,

    #[serde(default = "default_bridge_chain_id")]
    pub bridge_chain_id: u64,

    /// Account allowed to cancel anything and request valset updates.
    #[serde(default = "default_governance_address")]
    pub governance_address: String,

    #[serde(default = "default_quorum_numerator")]
    pub quorum_numerator: u64,

    #[serde(default = "default_quorum_denominator")]
    pub quorum_denominator: u64,

    /// How far past the last observed nonce a claim may be.
    #[serde(default = "default_nonce_window")]
    pub nonce_window: u64,

    #[serde(default = "default_batch_max_size")]
    pub batch_max_size: usize,

    #[serde(default = "default_batch_max_tx_age_secs")]
    pub batch_max_tx_age_secs: u64,

    /// Normalized power drift, in basis points, that triggers a new valset.
    #[serde(default = "default_power_drift_bps")]
    pub power_drift_bps: u64,

    /// Periodic valset interval in seconds; 0 disables it.
    #[serde(default)]
    pub valset_interval_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Genesis membership.
    #[serde(default)]
    pub validators: Vec<ValidatorEntry>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_bridge_contract() -> String {
    EthAddress::ZERO.to_string()
}

fn default_bridge_chain_id() -> u64 {
    1
}

fn default_governance_address() -> String {
    "grav1governance".to_string()
}

fn default_quorum_numerator() -> u64 {
    Quorum::TWO_THIRDS.numerator
}

fn default_quorum_denominator() -> u64 {
    Quorum::TWO_THIRDS.denominator
}

fn default_nonce_window() -> u64 {
    10_000
}

fn default_batch_max_size() -> usize {
    100
}

fn default_batch_max_tx_age_secs() -> u64 {
    86_400
}

fn default_power_drift_bps() -> u64 {
    500
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Validated engine parameters.
    pub fn bridge_params(&self) -> Result<BridgeParams, NodeError> {
        let bridge_contract = EthAddress::parse(&self.bridge_contract)
            .map_err(|e| NodeError::Config(format!("bridge_contract: {e}")))?;
        let governance = AccountAddress::parse(&self.governance_address)
            .map_err(|e| NodeError::Config(format!("governance_address: {e}")))?;
        let quorum = Quorum::new(self.quorum_numerator, self.quorum_denominator)
            .map_err(|e| NodeError::Config(e.to_string()))?;
        if self.batch_max_size == 0 {
            return Err(NodeError::Config("batch_max_size must be positive".into()));
        }
        Ok(BridgeParams {
            bridge_contract,
            bridge_chain_id: self.bridge_chain_id,
            governance,
            quorum,
            nonce_window: self.nonce_window,
            batch_max_size: self.batch_max_size,
            batch_max_tx_age_secs: self.batch_max_tx_age_secs,
            power_drift_bps: self.power_drift_bps,
            valset_interval_secs: self.valset_interval_secs,
        })
    }

    /// Genesis membership as valset members.
    pub fn members(&self) -> Result<Vec<ValsetMember>, NodeError> {
        self.validators
            .iter()
            .map(|v| {
                let address = AccountAddress::parse(&v.address)
                    .map_err(|e| NodeError::Config(format!("validator: {e}")))?;
                Ok(ValsetMember::new(address, v.power))
            })
            .collect()
    }

    /// Delegate keys of every validator that configured one.
    pub fn key_directory(&self) -> Result<KeyDirectory, NodeError> {
        let mut directory = KeyDirectory::new();
        for v in &self.validators {
            let Some(key_hex) = &v.delegate_key else {
                continue;
            };
            let address = AccountAddress::parse(&v.address)
                .map_err(|e| NodeError::Config(format!("validator: {e}")))?;
            let bytes: [u8; 32] = hex::decode(key_hex)
                .ok()
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| NodeError::Config(format!("delegate_key of {address}")))?;
            directory
                .register(address.clone(), PublicKey(bytes))
                .map_err(|e| NodeError::Config(format!("delegate_key of {address}: {e}")))?;
        }
        Ok(directory)
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bridge_contract: default_bridge_contract(),
            bridge_chain_id: default_bridge_chain_id(),
            governance_address: default_governance_address(),
            quorum_numerator: default_quorum_numerator(),
            quorum_denominator: default_quorum_denominator(),
            nonce_window: default_nonce_window(),
            batch_max_size: default_batch_max_size(),
            batch_max_tx_age_secs: default_batch_max_tx_age_secs(),
            power_drift_bps: default_power_drift_bps(),
            valset_interval_secs: 0,
            log_format: default_log_format(),
            log_level: default_log_level(),
            validators: Vec::new(),
        }
    }
}
