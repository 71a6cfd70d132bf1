// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK SUITE - shp-crypto
//
// Every transaction costs one signature check and every accumulator
// step costs one hash; these are the numbers that bound block size.
//
// Run: cargo bench -p shp-crypto
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shp_crypto::{generate_keypair, hash, sign_message, verify_signature, FieldHasher};

fn bench_sign(c: &mut Criterion) {
    let kp = generate_keypair();
    let mut group = c.benchmark_group("crypto/sign");
    for msg_size in [32, 256, 1024] {
        let message = vec![0xAB; msg_size];
        group.bench_with_input(BenchmarkId::new("Ed25519", msg_size), &message, |b, msg| {
            b.iter(|| black_box(sign_message(msg, &kp.secret_key).unwrap()))
        });
    }
    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let kp = generate_keypair();
    let message = [0x11u8; 32];
    let sig = sign_message(&message, &kp.secret_key).unwrap();
    c.bench_function("crypto/verify (Ed25519)", |b| {
        b.iter(|| black_box(verify_signature(&message, &sig, &kp.public_key)))
    });
}

fn bench_hash(c: &mut Criterion) {
    let left = [1u8; 32];
    let right = [2u8; 32];
    c.bench_function("crypto/sha3_256 (64 bytes)", |b| {
        b.iter(|| black_box(hash(&[left, right].concat())))
    });
    c.bench_function("crypto/field_hasher (node)", |b| {
        b.iter(|| black_box(FieldHasher::new(1).field(&left).field(&right).finish()))
    });
}

criterion_group!(benches, bench_sign, bench_verify, bench_hash);
criterion_main!(benches);
