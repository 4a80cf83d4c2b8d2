//! Events the engine reports to external observers.
//!
//! Names and attribute keys are part of the bridge's public interface and
//! must not change.

use serde::Serialize;

pub const EVENT_OBSERVATION: &str = "observation";
pub const EVENT_OUTGOING_BATCH: &str = "outgoing_batch";
pub const EVENT_MULTISIG_UPDATE_REQUEST: &str = "multisig_update_request";
pub const EVENT_OUTGOING_BATCH_CANCELED: &str = "outgoing_batch_canceled";
pub const EVENT_OUTGOING_LOGIC_CALL_CANCELED: &str = "outgoing_logic_call_canceled";
pub const EVENT_WITHDRAWAL_RECEIVED: &str = "withdrawal_received";
pub const EVENT_DEPOSIT_RECEIVED: &str = "deposit_received";
pub const EVENT_WITHDRAW_CANCELED: &str = "withdraw_canceled";

pub const ATTR_ATTESTATION_ID: &str = "attestation_id";
pub const ATTR_BATCH_CONFIRM_KEY: &str = "batch_confirm_key";
pub const ATTR_VALSET_CONFIRM_KEY: &str = "valset_confirm_key";
pub const ATTR_OUTGOING_BATCH_ID: &str = "batch_id";
pub const ATTR_OUTGOING_TX_ID: &str = "outgoing_tx_id";
pub const ATTR_ATTESTATION_TYPE: &str = "attestation_type";
pub const ATTR_CONTRACT: &str = "bridge_contract";
pub const ATTR_NONCE: &str = "nonce";
pub const ATTR_VALSET_NONCE: &str = "valset_nonce";
pub const ATTR_BATCH_NONCE: &str = "batch_nonce";
pub const ATTR_BRIDGE_CHAIN_ID: &str = "bridge_chain_id";
pub const ATTR_SET_OPERATOR_ADDR: &str = "set_operator_address";
pub const ATTR_INVALIDATION_ID: &str = "logic_call_invalidation_id";
pub const ATTR_INVALIDATION_NONCE: &str = "logic_call_invalidation_nonce";

/// A named event with string attributes, in emission order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BridgeEvent {
    pub name: &'static str,
    pub attributes: Vec<(&'static str, String)>,
}

impl BridgeEvent {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &'static str, value: impl ToString) -> Self {
        self.attributes.push((key, value.to_string()));
        self
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Consumer of events once an operation has produced them.
pub trait EventSink {
    fn publish(&self, event: &BridgeEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_keep_order_and_lookup() {
        let ev = BridgeEvent::new(EVENT_OUTGOING_BATCH)
            .attr(ATTR_BATCH_NONCE, 3)
            .attr(ATTR_BRIDGE_CHAIN_ID, 1);
        assert_eq!(ev.name, "outgoing_batch");
        assert_eq!(ev.get("batch_nonce"), Some("3"));
        assert_eq!(ev.get("bridge_chain_id"), Some("1"));
        assert_eq!(ev.get("nonce"), None);
        assert_eq!(ev.attributes[0].0, ATTR_BATCH_NONCE);
    }
}
