// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK SUITE - shp-consensus
//
// Measures block validation and the full propose → apply cycle.
// Run: cargo bench -p shp-consensus
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shp_consensus::fork::no_fetch;
use shp_consensus::validation::validate_block;
use shp_consensus::{ConsensusParams, DifficultyPolicy, GenesisAccount, NodeState, ProposeOutcome};
use shp_core::{LotteryTicket, PublicKey};
use shp_crypto::{generate_keypair_from_seed, KeyPair};

fn params(batch: usize) -> ConsensusParams {
    ConsensusParams {
        difficulty: DifficultyPolicy::Fixed { factor: u128::MAX },
        transactions_per_block: batch,
        propose_empty_blocks: true,
        ..Default::default()
    }
}

fn seeded(i: usize) -> KeyPair {
    generate_keypair_from_seed(format!("bench-consensus-seed-material-{i:06}").as_bytes()).unwrap()
}

/// `accounts` funded nodes plus a proposal paying 1 between `pairs` disjoint pairs.
fn setup(accounts: usize, pairs: usize) -> (Vec<NodeState>, shp_core::BlockProposal) {
    let p = params(pairs.max(1));
    let keys: Vec<KeyPair> = (0..accounts).map(seeded).collect();
    let genesis: Vec<GenesisAccount> = keys
        .iter()
        .map(|kp| GenesisAccount {
            public_key: PublicKey::from_slice(&kp.public_key).unwrap(),
            money: 1_000,
        })
        .collect();
    let mut nodes: Vec<NodeState> = keys
        .into_iter()
        .map(|kp| NodeState::new(p.clone(), kp, &genesis).unwrap())
        .collect();
    for i in 0..pairs {
        let (from, to) = (1 + 2 * i, 2 + 2 * i);
        let request = nodes[from].payment_request(*nodes[to].public_key(), 1).unwrap();
        let tx = nodes[to].accept_payment_request(&request).unwrap().unwrap();
        nodes[0].submit_transaction(tx).unwrap();
    }
    let proposal = match nodes[0].propose(1).unwrap() {
        ProposeOutcome::Proposed(p) => p,
        other => panic!("unexpected {:?}", other),
    };
    (nodes, proposal)
}

// ─────────────────────────────────────────────────────────────────
// VALIDATION BENCHMARKS
// ─────────────────────────────────────────────────────────────────

fn bench_validate_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation/block");
    group.sample_size(20);
    for pairs in [1usize, 8, 32] {
        let (nodes, proposal) = setup(2 * pairs + 1, pairs);
        let params = nodes[0].params().clone();
        group.bench_with_input(BenchmarkId::new("txs", pairs), &proposal, |b, p| {
            b.iter(|| black_box(validate_block(p, &params, None)))
        });
    }
    group.finish();
}

fn bench_lottery_window(c: &mut Criterion) {
    let key = PublicKey([7u8; 32]);
    c.bench_function("lottery/best_in_60s", |b| {
        b.iter(|| black_box(LotteryTicket::best_in(1_000..=1_059, key)))
    });
}

// ─────────────────────────────────────────────────────────────────
// APPLY BENCHMARKS
// ─────────────────────────────────────────────────────────────────

fn bench_receive_and_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("node/receive_commit");
    group.sample_size(10);
    for pairs in [1usize, 16] {
        let (nodes, proposal) = setup(2 * pairs + 1, pairs);
        let template = nodes[1].persisted();
        group.bench_with_input(BenchmarkId::new("txs", pairs), &proposal, |b, p| {
            b.iter(|| {
                let mut node =
                    NodeState::restore(params(pairs), seeded(1), template.clone()).unwrap();
                node.on_block_proposal(p.clone(), 1, &mut no_fetch).unwrap();
                black_box(node.finalize_round().unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_validate_block, bench_lottery_window, bench_receive_and_commit);
criterion_main!(benches);
