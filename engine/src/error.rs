use gravity_store::StoreError;
use gravity_types::{AccountAddress, ConfirmSubject};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    // ── Rejected input ────────────────────────────────────────────────
    #[error("claim by {claimant} for event nonce {event_nonce} already recorded")]
    DuplicateClaim {
        claimant: AccountAddress,
        event_nonce: u64,
    },

    #[error("claimant {0} is not in the current validator set")]
    UnknownClaimant(AccountAddress),

    #[error("{confirmer} already confirmed {subject}")]
    DuplicateConfirmation {
        subject: ConfirmSubject,
        confirmer: AccountAddress,
    },

    #[error("invalid proof from {confirmer} for {subject}")]
    InvalidProof {
        subject: ConfirmSubject,
        confirmer: AccountAddress,
    },

    #[error("{requester} is not allowed to {action}")]
    Unauthorized {
        requester: AccountAddress,
        action: &'static str,
    },

    #[error("{0} is not pending")]
    NotPending(ConfirmSubject),

    #[error("unknown or canceled subject {0}")]
    UnknownSubject(ConfirmSubject),

    #[error("{0} already exists")]
    DuplicateSubject(ConfirmSubject),

    #[error("no unbatched transfers eligible for a batch")]
    NothingToBatch,

    #[error("outgoing transfer {0} not found")]
    UnknownTransfer(u64),

    #[error("outgoing transfer {0} is already in a batch")]
    TransferBatched(u64),

    #[error("invalid transfer: {0}")]
    InvalidTransfer(&'static str),

    #[error("validator membership is empty")]
    EmptyMembership,

    // ── Ordering ──────────────────────────────────────────────────────
    #[error(
        "event nonce {event_nonce} too far ahead of last observed {last_observed} (window {window})"
    )]
    NonceWindowExceeded {
        event_nonce: u64,
        last_observed: u64,
        window: u64,
    },

    // ── Backend ───────────────────────────────────────────────────────
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl BridgeError {
    /// Ordering errors clear up once the nonce gap closes; everything else
    /// is the caller's fault or a backend failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NonceWindowExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ordering_errors_are_retryable() {
        let window = BridgeError::NonceWindowExceeded {
            event_nonce: 50,
            last_observed: 1,
            window: 10,
        };
        assert!(window.is_retryable());
        assert!(!BridgeError::NothingToBatch.is_retryable());
        assert!(!BridgeError::UnknownClaimant(AccountAddress::new("grav1x")).is_retryable());
    }

    #[test]
    fn messages_name_the_subject() {
        let err = BridgeError::NotPending(ConfirmSubject::Batch(4));
        assert_eq!(err.to_string(), "batch/4 is not pending");
    }
}
