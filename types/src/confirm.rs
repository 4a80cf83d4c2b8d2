//! Confirmations collected from validators for relayable subjects.

use crate::AccountAddress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something validators sign before it can be relayed to the external chain.
///
/// Subjects are referenced by id only; the collector never owns them.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfirmSubject {
    Batch(u64),
    Valset(u64),
    LogicCall {
        invalidation_id: Vec<u8>,
        invalidation_nonce: u64,
    },
}

impl fmt::Display for ConfirmSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Batch(nonce) => write!(f, "batch/{nonce}"),
            Self::Valset(nonce) => write!(f, "valset/{nonce}"),
            Self::LogicCall {
                invalidation_id,
                invalidation_nonce,
            } => {
                write!(f, "logic_call/")?;
                for b in invalidation_id {
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "/{invalidation_nonce}")
            }
        }
    }
}

/// One validator's signature over a subject's checkpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub subject: ConfirmSubject,
    pub confirmer: AccountAddress,
    /// Opaque proof, checked by the external verifier.
    pub proof: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_display() {
        assert_eq!(ConfirmSubject::Batch(7).to_string(), "batch/7");
        assert_eq!(ConfirmSubject::Valset(2).to_string(), "valset/2");
        let call = ConfirmSubject::LogicCall {
            invalidation_id: vec![0xde, 0xad],
            invalidation_nonce: 3,
        };
        assert_eq!(call.to_string(), "logic_call/dead/3");
    }
}
