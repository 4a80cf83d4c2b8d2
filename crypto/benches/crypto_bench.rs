use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gravity_crypto::ProofVerifier;
use gravity_types::{AccountAddress, ClaimPayload, ContentHash, EthAddress, OutgoingTransfer, Timestamp};

fn attestation_id_bench(c: &mut Criterion) {
    let payload = ClaimPayload::Deposit {
        token_contract: EthAddress::new([1; 20]),
        amount: 1_000_000,
        sender: EthAddress::new([2; 20]),
        receiver: AccountAddress::new("grav1receiver"),
        block_height: 1_234,
    };

    c.bench_function("attestation_id_deposit", |b| {
        b.iter(|| gravity_crypto::attestation_id(black_box(42), black_box(&payload)))
    });
}

fn batch_checkpoint_bench(c: &mut Criterion) {
    let transfers: Vec<OutgoingTransfer> = (0..100)
        .map(|id| OutgoingTransfer {
            id,
            sender: AccountAddress::new("grav1sender"),
            destination: EthAddress::new([3; 20]),
            amount: 500,
            fee: id as u128,
            created_at: Timestamp::new(id),
        })
        .collect();
    let contract = EthAddress::new([9; 20]);

    c.bench_function("batch_checkpoint_100tx", |b| {
        b.iter(|| gravity_crypto::batch_checkpoint(&contract, black_box(7), black_box(&transfers)))
    });
}

fn confirmation_verify_bench(c: &mut Criterion) {
    let kp = gravity_crypto::keypair_from_seed(&[11u8; 32]);
    let validator = AccountAddress::new("grav1alice");
    let mut dir = gravity_crypto::KeyDirectory::new();
    dir.register(validator.clone(), kp.public).unwrap();
    let checkpoint = ContentHash::new([5u8; 32]);
    let proof = gravity_crypto::sign_message(checkpoint.as_bytes(), &kp.private).to_vec();

    c.bench_function("key_directory_verify", |b| {
        b.iter(|| dir.verify(black_box(&checkpoint), &validator, black_box(&proof)))
    });
}

criterion_group!(
    benches,
    attestation_id_bench,
    batch_checkpoint_bench,
    confirmation_verify_bench
);
criterion_main!(benches);
