//! Commands accepted by the node, one JSON object per line.
//!
//! Addresses are strings (`grav1...` or `0x...`), byte strings are hex and
//! token amounts are decimal strings so they survive JSON round trips at
//! full 128-bit width.

use serde::{Deserialize, Serialize};

use gravity_engine::{LogicCallRequest, ValsetTrigger};
use gravity_types::{
    AccountAddress, ClaimPayload, ConfirmSubject, EthAddress, ValsetMember,
};

use crate::NodeError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Claim {
        event_nonce: u64,
        claimant: String,
        at: u64,
        payload: ClaimInput,
    },
    AddTransfer {
        sender: String,
        destination: String,
        amount: String,
        fee: String,
        at: u64,
    },
    CancelTransfer {
        id: u64,
        requester: String,
    },
    /// Size and age limits fall back to the configured ones.
    BuildBatch {
        #[serde(default)]
        max_size: Option<usize>,
        #[serde(default)]
        max_tx_age_secs: Option<u64>,
        at: u64,
    },
    RequestValsetUpdate {
        trigger: TriggerInput,
        #[serde(default)]
        requester: Option<String>,
        at: u64,
    },
    EndBlock {
        at: u64,
    },
    SubmitLogicCall {
        invalidation_id: String,
        invalidation_nonce: u64,
        target: String,
        payload: String,
        timeout: u64,
        requester: String,
        at: u64,
    },
    Confirm {
        subject: SubjectInput,
        confirmer: String,
        proof: String,
    },
    CancelBatch {
        batch_nonce: u64,
        requester: String,
    },
    CancelLogicCall {
        invalidation_id: String,
        invalidation_nonce: u64,
        requester: String,
    },
    /// Staking change reported by the registry.
    SetPower {
        validator: String,
        power: u64,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaimInput {
    Deposit {
        token_contract: String,
        amount: String,
        sender: String,
        receiver: String,
        block_height: u64,
    },
    Withdrawal {
        batch_nonce: u64,
        block_height: u64,
    },
    ValsetUpdated {
        valset_nonce: u64,
        members: Vec<MemberInput>,
        block_height: u64,
    },
    LogicCallExecuted {
        invalidation_id: String,
        invalidation_nonce: u64,
        block_height: u64,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInput {
    pub validator: String,
    pub power: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerInput {
    PowerDrift,
    Periodic,
    Admin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubjectInput {
    Batch {
        nonce: u64,
    },
    Valset {
        nonce: u64,
    },
    LogicCall {
        invalidation_id: String,
        invalidation_nonce: u64,
    },
}

impl Command {
    pub fn from_json(line: &str) -> Result<Self, NodeError> {
        serde_json::from_str(line).map_err(|e| NodeError::InvalidCommand(e.to_string()))
    }

    /// Short name used in logs and spans.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Claim { .. } => "claim",
            Self::AddTransfer { .. } => "add_transfer",
            Self::CancelTransfer { .. } => "cancel_transfer",
            Self::BuildBatch { .. } => "build_batch",
            Self::RequestValsetUpdate { .. } => "request_valset_update",
            Self::EndBlock { .. } => "end_block",
            Self::SubmitLogicCall { .. } => "submit_logic_call",
            Self::Confirm { .. } => "confirm",
            Self::CancelBatch { .. } => "cancel_batch",
            Self::CancelLogicCall { .. } => "cancel_logic_call",
            Self::SetPower { .. } => "set_power",
        }
    }
}

impl ClaimInput {
    pub fn into_payload(self) -> Result<ClaimPayload, NodeError> {
        Ok(match self {
            Self::Deposit {
                token_contract,
                amount,
                sender,
                receiver,
                block_height,
            } => ClaimPayload::Deposit {
                token_contract: eth(&token_contract)?,
                amount: amount_of(&amount)?,
                sender: eth(&sender)?,
                receiver: account(&receiver)?,
                block_height,
            },
            Self::Withdrawal {
                batch_nonce,
                block_height,
            } => ClaimPayload::Withdrawal {
                batch_nonce,
                block_height,
            },
            Self::ValsetUpdated {
                valset_nonce,
                members,
                block_height,
            } => ClaimPayload::ValsetUpdated {
                valset_nonce,
                members: members
                    .into_iter()
                    .map(|m| Ok(ValsetMember::new(account(&m.validator)?, m.power)))
                    .collect::<Result<_, NodeError>>()?,
                block_height,
            },
            Self::LogicCallExecuted {
                invalidation_id,
                invalidation_nonce,
                block_height,
            } => ClaimPayload::LogicCallExecuted {
                invalidation_id: bytes(&invalidation_id)?,
                invalidation_nonce,
                block_height,
            },
        })
    }
}

impl TriggerInput {
    pub fn into_trigger(self, requester: Option<&str>) -> Result<ValsetTrigger, NodeError> {
        Ok(match self {
            Self::PowerDrift => ValsetTrigger::PowerDrift,
            Self::Periodic => ValsetTrigger::Periodic,
            Self::Admin => {
                let requester = requester.ok_or_else(|| {
                    NodeError::InvalidCommand("admin trigger needs a requester".into())
                })?;
                ValsetTrigger::Admin {
                    requester: account(requester)?,
                }
            }
        })
    }
}

impl SubjectInput {
    pub fn into_subject(self) -> Result<ConfirmSubject, NodeError> {
        Ok(match self {
            Self::Batch { nonce } => ConfirmSubject::Batch(nonce),
            Self::Valset { nonce } => ConfirmSubject::Valset(nonce),
            Self::LogicCall {
                invalidation_id,
                invalidation_nonce,
            } => ConfirmSubject::LogicCall {
                invalidation_id: bytes(&invalidation_id)?,
                invalidation_nonce,
            },
        })
    }
}

/// Build the engine request for a `submit_logic_call` command.
pub fn logic_call_request(
    invalidation_id: &str,
    invalidation_nonce: u64,
    target: &str,
    payload: &str,
    timeout: u64,
) -> Result<LogicCallRequest, NodeError> {
    Ok(LogicCallRequest {
        invalidation_id: bytes(invalidation_id)?,
        invalidation_nonce,
        target: eth(target)?,
        payload: bytes(payload)?,
        timeout,
    })
}

// ── Field parsers ──────────────────────────────────────────────────────

pub fn account(raw: &str) -> Result<AccountAddress, NodeError> {
    AccountAddress::parse(raw).map_err(|e| NodeError::InvalidCommand(e.to_string()))
}

pub fn eth(raw: &str) -> Result<EthAddress, NodeError> {
    EthAddress::parse(raw).map_err(|e| NodeError::InvalidCommand(e.to_string()))
}

pub fn amount_of(raw: &str) -> Result<u128, NodeError> {
    raw.parse()
        .map_err(|_| NodeError::InvalidCommand(format!("invalid amount {raw:?}")))
}

pub fn bytes(raw: &str) -> Result<Vec<u8>, NodeError> {
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(raw).map_err(|e| NodeError::InvalidCommand(format!("invalid hex: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_deposit_claim() {
        let line = r#"{"op":"claim","event_nonce":3,"claimant":"grav1alice","at":7,
            "payload":{"type":"deposit","token_contract":"0x7070707070707070707070707070707070707070",
            "amount":"340282366920938463463374607431768211455","sender":"0x0101010101010101010101010101010101010101",
            "receiver":"grav1bob","block_height":12}}"#;
        let Command::Claim { payload, .. } = Command::from_json(line).unwrap() else {
            panic!("expected a claim");
        };
        match payload.into_payload().unwrap() {
            ClaimPayload::Deposit { amount, .. } => assert_eq!(amount, u128::MAX),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn optional_batch_limits() {
        let cmd = Command::from_json(r#"{"op":"build_batch","at":5}"#).unwrap();
        assert_eq!(
            cmd,
            Command::BuildBatch {
                max_size: None,
                max_tx_age_secs: None,
                at: 5
            }
        );
        assert_eq!(cmd.op(), "build_batch");
    }

    #[test]
    fn subject_with_hex_id() {
        let cmd = Command::from_json(
            r#"{"op":"confirm","subject":{"kind":"logic_call","invalidation_id":"0xcafe","invalidation_nonce":2},
                "confirmer":"grav1alice","proof":"00"}"#,
        )
        .unwrap();
        let Command::Confirm { subject, .. } = cmd else {
            panic!("expected a confirm");
        };
        assert_eq!(
            subject.into_subject().unwrap(),
            ConfirmSubject::LogicCall {
                invalidation_id: vec![0xca, 0xfe],
                invalidation_nonce: 2
            }
        );
    }

    #[test]
    fn bad_input_is_invalid_command() {
        assert!(matches!(
            Command::from_json(r#"{"op":"teleport"}"#),
            Err(NodeError::InvalidCommand(_))
        ));
        assert!(matches!(account("cosmos1x"), Err(NodeError::InvalidCommand(_))));
        assert!(matches!(amount_of("-1"), Err(NodeError::InvalidCommand(_))));
        assert!(matches!(
            TriggerInput::Admin.into_trigger(None),
            Err(NodeError::InvalidCommand(_))
        ));
    }
}
