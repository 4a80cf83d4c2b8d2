//! Cancellation of pending batches and logic calls.

use crate::batch::BatchBuilder;
use crate::error::BridgeError;
use crate::logic_call::LogicCallPool;
use gravity_store::BridgeStore;
use gravity_types::{AccountAddress, BridgeEvent, ConfirmSubject};
use tracing::warn;

pub struct CancellationHandler {
    governance: AccountAddress,
}

impl CancellationHandler {
    pub fn new(governance: AccountAddress) -> Self {
        Self { governance }
    }

    /// Cancel a pending batch. Allowed for governance, or for a requester
    /// who sent every transfer in it.
    pub fn cancel_batch<S: BridgeStore + ?Sized>(
        &self,
        store: &S,
        batches: &mut BatchBuilder,
        batch_nonce: u64,
        requester: &AccountAddress,
    ) -> Result<BridgeEvent, BridgeError> {
        let subject = ConfirmSubject::Batch(batch_nonce);
        let batch = batches
            .batch(batch_nonce)
            .ok_or_else(|| BridgeError::UnknownSubject(subject.clone()))?;
        if !batch.is_pending() {
            return Err(BridgeError::NotPending(subject));
        }
        let owns_all = batch.transfers.iter().all(|t| &t.sender == requester);
        if requester != &self.governance && !owns_all {
            warn!(%subject, %requester, "cancellation refused");
            return Err(BridgeError::Unauthorized {
                requester: requester.clone(),
                action: "cancel this batch",
            });
        }
        batches.cancel(store, batch_nonce)
    }

    /// Cancel a pending logic call. Allowed for governance or its creator.
    pub fn cancel_logic_call<S: BridgeStore + ?Sized>(
        &self,
        store: &S,
        calls: &mut LogicCallPool,
        invalidation_id: &[u8],
        invalidation_nonce: u64,
        requester: &AccountAddress,
    ) -> Result<BridgeEvent, BridgeError> {
        let subject = ConfirmSubject::LogicCall {
            invalidation_id: invalidation_id.to_vec(),
            invalidation_nonce,
        };
        let call = calls
            .get(invalidation_id, invalidation_nonce)
            .ok_or_else(|| BridgeError::UnknownSubject(subject.clone()))?;
        if !call.is_pending() {
            return Err(BridgeError::NotPending(subject));
        }
        if requester != &self.governance && requester != &call.creator {
            warn!(%subject, %requester, "cancellation refused");
            return Err(BridgeError::Unauthorized {
                requester: requester.clone(),
                action: "cancel this logic call",
            });
        }
        calls.cancel(store, invalidation_id, invalidation_nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic_call::LogicCallRequest;
    use gravity_nullables::NullStore;
    use gravity_types::event::{ATTR_BATCH_NONCE, ATTR_OUTGOING_TX_ID};
    use gravity_types::{EthAddress, Timestamp};

    fn addr(name: &str) -> AccountAddress {
        AccountAddress::new(format!("grav1{name}"))
    }

    fn handler() -> CancellationHandler {
        CancellationHandler::new(addr("governance"))
    }

    fn one_batch(store: &NullStore, senders: &[&str]) -> BatchBuilder {
        let mut batches = BatchBuilder::new(EthAddress::ZERO, 1);
        for who in senders {
            batches
                .add_transfer(store, addr(who), EthAddress::new([1; 20]), 10, 1, Timestamp::EPOCH)
                .unwrap();
        }
        batches
            .build_batch(store, 10, 60, Timestamp::EPOCH, 1)
            .unwrap();
        batches
    }

    #[test]
    fn sole_owner_may_cancel() {
        let store = NullStore::new();
        let mut batches = one_batch(&store, &["alice", "alice"]);
        let event = handler()
            .cancel_batch(&store, &mut batches, 1, &addr("alice"))
            .unwrap();
        assert_eq!(event.get(ATTR_BATCH_NONCE), Some("1"));
        assert_eq!(event.get(ATTR_OUTGOING_TX_ID), Some("1,2"));
        assert!(batches.is_unbatched(1) && batches.is_unbatched(2));
    }

    #[test]
    fn partial_owner_is_refused_but_governance_is_not() {
        let store = NullStore::new();
        let mut batches = one_batch(&store, &["alice", "bob"]);
        assert!(matches!(
            handler().cancel_batch(&store, &mut batches, 1, &addr("alice")),
            Err(BridgeError::Unauthorized { .. })
        ));
        assert!(handler()
            .cancel_batch(&store, &mut batches, 1, &addr("governance"))
            .is_ok());
    }

    #[test]
    fn second_cancel_is_not_pending() {
        let store = NullStore::new();
        let mut batches = one_batch(&store, &["alice"]);
        handler()
            .cancel_batch(&store, &mut batches, 1, &addr("alice"))
            .unwrap();
        assert!(matches!(
            handler().cancel_batch(&store, &mut batches, 1, &addr("alice")),
            Err(BridgeError::NotPending(ConfirmSubject::Batch(1)))
        ));
        assert!(matches!(
            handler().cancel_batch(&store, &mut batches, 5, &addr("alice")),
            Err(BridgeError::UnknownSubject(_))
        ));
    }

    #[test]
    fn logic_call_cancel_by_creator() {
        let store = NullStore::new();
        let mut calls = LogicCallPool::new(EthAddress::ZERO);
        let request = LogicCallRequest {
            invalidation_id: vec![7],
            invalidation_nonce: 1,
            target: EthAddress::new([2; 20]),
            payload: vec![],
            timeout: 10,
        };
        calls
            .submit(&store, request, addr("governance"), Timestamp::EPOCH, 1)
            .unwrap();
        assert!(matches!(
            handler().cancel_logic_call(&store, &mut calls, &[7], 1, &addr("bob")),
            Err(BridgeError::Unauthorized { .. })
        ));
        let event = handler()
            .cancel_logic_call(&store, &mut calls, &[7], 1, &addr("governance"))
            .unwrap();
        assert_eq!(event.get("logic_call_invalidation_id"), Some("07"));
        assert!(matches!(
            handler().cancel_logic_call(&store, &mut calls, &[7], 1, &addr("governance")),
            Err(BridgeError::NotPending(_))
        ));
    }
}
