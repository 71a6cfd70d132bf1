// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK SUITE - shp-core
//
// Accumulator operations and record hashing.
// Run: cargo bench -p shp-core
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shp_core::accumulator::Accumulator;
use shp_core::{balance_data, BalanceInfo, Block, Hash, LotteryTicket, PublicKey};

fn filled(n: u64) -> (Accumulator, Vec<Vec<Hash>>) {
    let mut acc = Accumulator::new();
    let mut proofs: Vec<Vec<Hash>> = Vec::new();
    for i in 0..n {
        let data = balance_data(&PublicKey([(i % 251) as u8; 32]), i);
        let (_, proof) = acc
            .insert_refreshing(&data, proofs.iter_mut().enumerate().map(|(p, w)| (p as u64, w)))
            .unwrap();
        proofs.push(proof);
    }
    (acc, proofs)
}

// ─────────────────────────────────────────────────────────────────
// ACCUMULATOR BENCHMARKS
// ─────────────────────────────────────────────────────────────────

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulator/insert");
    for n in [1_000u64, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut acc = Accumulator::new();
            for i in 0..n {
                acc.insert(&balance_data(&PublicKey([1u8; 32]), i)).unwrap();
            }
            b.iter(|| {
                let mut local = acc.clone();
                black_box(local.insert(&[7u8; 32]).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_verify_and_update(c: &mut Criterion) {
    let (acc, proofs) = filled(1024);
    let data = balance_data(&PublicKey([(500 % 251) as u8; 32]), 500);
    c.bench_function("accumulator/verify (n=1024)", |b| {
        b.iter(|| black_box(acc.verify(&data, 500, &proofs[500])))
    });
    c.bench_function("accumulator/update (n=1024)", |b| {
        b.iter(|| {
            let mut local = acc.clone();
            black_box(local.update(&[9u8; 32], 500, &proofs[500]).unwrap())
        })
    });
}

// ─────────────────────────────────────────────────────────────────
// RECORD BENCHMARKS
// ─────────────────────────────────────────────────────────────────

fn bench_block_hash(c: &mut Criterion) {
    let proposer = BalanceInfo::new(PublicKey([2u8; 32]), 50, 3, vec![[1u8; 32]; 10]);
    let users: Vec<PublicKey> = (0..100u8).map(|i| PublicKey([i; 32])).collect();
    c.bench_function("block/seal (100 users)", |b| {
        b.iter(|| black_box(Block::new(9, [0u8; 32], proposer.clone(), vec![], users.clone(), 1)))
    });
    c.bench_function("lottery/best_in (60 s window)", |b| {
        b.iter(|| black_box(LotteryTicket::best_in(1..=60, PublicKey([2u8; 32]))))
    });
}

criterion_group!(benches, bench_insert, bench_verify_and_update, bench_block_hash);
criterion_main!(benches);
