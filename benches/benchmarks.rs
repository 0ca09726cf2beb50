//! Performance benchmarks for the tally cryptography core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use veritally::proofs::ChaumPedersenProof;
use veritally::{elgamal, Ciphertext, ElementModQ, GroupParams, KeyPair};

fn benchmark_encryption(c: &mut Criterion) {
    let mut group = c.benchmark_group("encryption");

    for params in [GroupParams::large_test(), GroupParams::standard()] {
        let bits = params.large_prime().bits();
        let keypair = KeyPair::random(&params);
        group.bench_with_input(BenchmarkId::from_parameter(bits), &params, |b, params| {
            b.iter(|| {
                let nonce = params.rand_range_q(&ElementModQ::one());
                elgamal::encrypt(params, black_box(1), &nonce, &keypair.public_key)
                    .expect("encryption succeeds")
            });
        });
    }

    group.finish();
}

fn benchmark_homomorphic_accumulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulation");

    let params = GroupParams::large_test();
    let keypair = KeyPair::random(&params);
    for count in [10usize, 100, 1000] {
        let ciphertexts: Vec<Ciphertext> = (0..count)
            .map(|_| {
                let nonce = params.rand_range_q(&ElementModQ::one());
                elgamal::encrypt(&params, 1, &nonce, &keypair.public_key).unwrap()
            })
            .collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &ciphertexts,
            |b, ciphertexts| {
                b.iter(|| {
                    let refs: Vec<&Ciphertext> = ciphertexts.iter().collect();
                    elgamal::add(&params, black_box(&refs)).expect("accumulation succeeds")
                });
            },
        );
    }

    group.finish();
}

fn benchmark_proof_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("chaum_pedersen");

    let params = GroupParams::large_test();
    let keypair = KeyPair::random(&params);
    let nonce = params.rand_range_q(&ElementModQ::one());
    let message = elgamal::encrypt(&params, 1, &nonce, &keypair.public_key).unwrap();
    let partial = message.partial_decrypt(&params, &keypair.secret_key);
    let base_hash = params.rand_q();
    let seed = params.rand_q();

    group.bench_function("make", |b| {
        b.iter(|| {
            ChaumPedersenProof::make(
                &params,
                black_box(&message),
                &keypair.secret_key,
                &partial,
                &seed,
                &base_hash,
            )
        });
    });

    let proof = ChaumPedersenProof::make(
        &params,
        &message,
        &keypair.secret_key,
        &partial,
        &seed,
        &base_hash,
    );
    group.bench_function("verify", |b| {
        b.iter(|| {
            proof.is_valid(
                &params,
                black_box(&message),
                &keypair.public_key,
                &partial,
                &base_hash,
            )
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_encryption,
    benchmark_homomorphic_accumulation,
    benchmark_proof_verification
);
criterion_main!(benches);
