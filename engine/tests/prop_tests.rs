use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use gravity_engine::{BridgeEngine, BridgeError, ClaimStatus, Outcome};
use gravity_nullables::{NullRegistry, NullStore, NullVerifier};
use gravity_types::event::EVENT_DEPOSIT_RECEIVED;
use gravity_types::{AccountAddress, BridgeParams, Claim, ClaimPayload, EthAddress, Timestamp};

const VALIDATORS: [(&str, u64); 4] = [("a", 30), ("b", 30), ("c", 20), ("d", 20)];
const NONCES: u64 = 6;

fn addr(name: &str) -> AccountAddress {
    AccountAddress::new(format!("grav1{name}"))
}

fn token() -> EthAddress {
    EthAddress::new([0x70; 20])
}

fn engine() -> BridgeEngine {
    engine_with(Arc::new(NullStore::new()))
}

fn engine_with(store: Arc<NullStore>) -> BridgeEngine {
    BridgeEngine::new(
        BridgeParams::default(),
        Arc::new(NullRegistry::with_powers(&VALIDATORS)),
        Arc::new(NullVerifier::new()),
        store,
        Timestamp::EPOCH,
    )
    .unwrap()
    .value
}

/// One deposit claim per validator per nonce; a dissenting validator claims
/// a different amount.
fn claims(dissent: &[bool]) -> Vec<Claim> {
    let mut out = Vec::new();
    for nonce in 1..=NONCES {
        for (i, (name, _)) in VALIDATORS.iter().enumerate() {
            let dissents = dissent[(nonce as usize - 1) * VALIDATORS.len() + i];
            let amount = if dissents { 1_000 + nonce as u128 } else { nonce as u128 };
            out.push(Claim::new(
                nonce,
                addr(name),
                ClaimPayload::Deposit {
                    token_contract: token(),
                    amount,
                    sender: EthAddress::new([1; 20]),
                    receiver: addr("receiver"),
                    block_height: nonce,
                },
                Timestamp::new(nonce),
            ));
        }
    }
    out
}

struct Run {
    last_observed: u64,
    balance: u128,
    applied: Vec<u64>,
    deposit_events: usize,
}

fn run(claims: &[Claim]) -> Run {
    let mut engine = engine();
    let mut applied = Vec::new();
    let mut deposit_events = 0;
    for claim in claims {
        let out = engine.submit_claim(claim.clone()).unwrap();
        if out.value.status == ClaimStatus::Ignored {
            assert!(out.events.is_empty());
        }
        applied.extend(out.value.applied);
        deposit_events += out
            .events
            .iter()
            .filter(|e| e.name == EVENT_DEPOSIT_RECEIVED)
            .count();
    }
    Run {
        last_observed: engine.last_observed_nonce(),
        balance: engine.balance(&addr("receiver"), &token()),
        applied,
        deposit_events,
    }
}

/// Like [`run`], but the store starts failing after `budget` more writes once
/// claim `at` is reached. A rejected claim is resubmitted after the store
/// recovers, and a final `advance` picks up anything left queued.
fn run_with_outage(claims: &[Claim], at: usize, budget: usize) -> Run {
    let store = Arc::new(NullStore::new());
    let mut engine = engine_with(store.clone());
    let mut applied = Vec::new();
    let mut deposit_events = 0;
    let mut tally = |out: Outcome<Vec<u64>>| {
        applied.extend(out.value);
        deposit_events += out
            .events
            .iter()
            .filter(|e| e.name == EVENT_DEPOSIT_RECEIVED)
            .count();
    };
    for (i, claim) in claims.iter().enumerate() {
        if i == at {
            store.fail_after(budget);
        }
        let out = match engine.submit_claim(claim.clone()) {
            Ok(out) => out,
            Err(BridgeError::Store(_)) => {
                store.fail_writes(false);
                engine.submit_claim(claim.clone()).unwrap()
            }
            Err(e) => panic!("unexpected error {e}"),
        };
        tally(Outcome {
            value: out.value.applied,
            events: out.events,
        });
    }
    store.fail_writes(false);
    tally(engine.advance().unwrap());
    Run {
        last_observed: engine.last_observed_nonce(),
        balance: engine.balance(&addr("receiver"), &token()),
        applied,
        deposit_events,
    }
}

fn ordered_and_shuffled() -> impl Strategy<Value = (Vec<Claim>, Vec<Claim>)> {
    prop::collection::vec(any::<bool>(), NONCES as usize * VALIDATORS.len()).prop_flat_map(
        |dissent| {
            let ordered = claims(&dissent);
            (Just(ordered.clone()), Just(ordered).prop_shuffle())
        },
    )
}

#[derive(Clone, Debug)]
enum Op {
    Add { fee: u128, sender: usize },
    Build { max_size: usize },
    Cancel { batch_nonce: u64, by_governance: bool },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u128..10, 0usize..2).prop_map(|(fee, sender)| Op::Add { fee, sender }),
        (1usize..4).prop_map(|max_size| Op::Build { max_size }),
        (1u64..6, any::<bool>()).prop_map(|(batch_nonce, by_governance)| Op::Cancel {
            batch_nonce,
            by_governance
        }),
    ]
}

proptest! {
    /// Any submission order of the same claims ends in the same state.
    #[test]
    fn reordering_claims_is_deterministic((ordered, shuffled) in ordered_and_shuffled()) {
        let a = run(&ordered);
        let b = run(&shuffled);
        prop_assert_eq!(a.last_observed, b.last_observed);
        prop_assert_eq!(a.balance, b.balance);
    }

    /// Every event nonce is applied at most once, gap-free from 1.
    #[test]
    fn each_nonce_applied_exactly_once((_, shuffled) in ordered_and_shuffled()) {
        let r = run(&shuffled);
        let unique: BTreeSet<u64> = r.applied.iter().copied().collect();
        prop_assert_eq!(unique.len(), r.applied.len(), "nonce applied twice: {:?}", r.applied);
        let expected: Vec<u64> = (1..=r.last_observed).collect();
        prop_assert_eq!(unique.into_iter().collect::<Vec<_>>(), expected);
        prop_assert!(r.deposit_events <= r.applied.len());
    }

    /// A storage outage at any point, once healed, ends in the same state
    /// as a run without one, with no nonce applied twice.
    #[test]
    fn recovery_from_store_outage_converges(
        (_, shuffled) in ordered_and_shuffled(),
        at in 0usize..NONCES as usize * VALIDATORS.len(),
        budget in 0usize..12,
    ) {
        let clean = run(&shuffled);
        let r = run_with_outage(&shuffled, at, budget);
        prop_assert_eq!(r.last_observed, clean.last_observed);
        prop_assert_eq!(r.balance, clean.balance);
        let unique: BTreeSet<u64> = r.applied.iter().copied().collect();
        prop_assert_eq!(unique.len(), r.applied.len(), "nonce applied twice: {:?}", r.applied);
        prop_assert_eq!(r.deposit_events, clean.deposit_events);
    }

    /// A transfer is in the pool or in exactly one live batch, never both.
    #[test]
    fn transfer_in_at_most_one_live_batch(ops in prop::collection::vec(op(), 1..40)) {
        let mut engine = engine();
        let senders = [addr("alice"), addr("bob")];
        let governance = engine.params().governance.clone();
        for op in ops {
            match op {
                Op::Add { fee, sender } => {
                    engine
                        .add_transfer(senders[sender].clone(), token(), 5, fee, Timestamp::new(10))
                        .unwrap();
                }
                Op::Build { max_size } => {
                    match engine.build_batch(max_size, 3_600, Timestamp::new(20)) {
                        Ok(_) | Err(BridgeError::NothingToBatch) => {}
                        Err(e) => prop_assert!(false, "unexpected error {e}"),
                    }
                }
                Op::Cancel { batch_nonce, by_governance } => {
                    let requester = if by_governance { &governance } else { &senders[0] };
                    let _ = engine.cancel_batch(batch_nonce, requester);
                }
            }

            let mut holders: BTreeMap<u64, usize> = BTreeMap::new();
            for batch in engine.pending_batches() {
                for id in batch.transfer_ids() {
                    *holders.entry(id).or_default() += 1;
                }
            }
            for (id, count) in &holders {
                prop_assert_eq!(*count, 1, "transfer {} in {} batches", id, count);
            }
            for transfer in engine.unbatched_transfers() {
                prop_assert!(!holders.contains_key(&transfer.id));
            }
        }
    }
}
