// ========================================
// FORK CHOICE TESTS FOR STAKEHEAP (SHP)
// ========================================
//
// Four funded nodes share one genesis: a=10, b=25, c=10, d=20.
// Branch A is built by a and c on top of genesis (stake 10 + 10).
//
// Test Scenarios:
// 1. Branch B (b alone, stake 25) beats A; a node on A switches
// 2. Branch D (d alone, stake 20) only ties A; the local chain stays
// 3. A transfer confirmed only on A is undone by the switch
//
// Usage:
//   cargo test --test fork_choice -- --nocapture
//
// ========================================

use shp_consensus::fork::no_fetch;
use shp_consensus::{
    ConsensusParams, DifficultyPolicy, GenesisAccount, NodeState, ProposalVerdict, ProposeOutcome,
};
use shp_core::{BlockProposal, Hash, PublicKey};
use shp_crypto::{generate_keypair_from_seed, KeyPair};

const A: usize = 0;
const B: usize = 1;
const C: usize = 2;
const D: usize = 3;
const STAKES: [u64; 4] = [10, 25, 10, 20];

/// Receiver clock; every block below is stamped earlier.
const RECEIVED_AT: u64 = 1_000;

fn keypair(i: usize) -> KeyPair {
    generate_keypair_from_seed(format!("fork-choice-test-node-seed-{i:06}").as_bytes()).unwrap()
}

fn params() -> ConsensusParams {
    ConsensusParams {
        difficulty: DifficultyPolicy::Fixed { factor: u128::MAX },
        propose_empty_blocks: true,
        ..Default::default()
    }
}

fn network() -> Vec<NodeState> {
    let genesis: Vec<GenesisAccount> = STAKES
        .iter()
        .enumerate()
        .map(|(i, money)| GenesisAccount {
            public_key: PublicKey::from_slice(&keypair(i).public_key).unwrap(),
            money: *money,
        })
        .collect();
    (0..STAKES.len())
        .map(|i| NodeState::new(params(), keypair(i), &genesis).unwrap())
        .collect()
}

fn propose(node: &mut NodeState, now: u64) -> BlockProposal {
    match node.propose(now).unwrap() {
        ProposeOutcome::Proposed(p) => p,
        other => panic!("expected a proposal, got {:?}", other),
    }
}

/// Deliver a block extending the receiver's tip and close the round.
fn extend(node: &mut NodeState, proposal: &BlockProposal) {
    assert_eq!(
        node.on_block_proposal(proposal.clone(), RECEIVED_AT, &mut no_fetch).unwrap(),
        ProposalVerdict::Buffered
    );
    assert_eq!(node.finalize_round().unwrap(), Some(*proposal.hash()));
}

/// Build branch A (a at t=10, c at t=11) and leave a and c on it.
fn build_branch_a(nodes: &mut [NodeState]) -> (Hash, Vec<Hash>) {
    let genesis = *nodes[A].tip_hash();
    let a1 = propose(&mut nodes[A], 10);
    extend(&mut nodes[C], &a1);
    let a2 = propose(&mut nodes[C], 11);
    extend(&mut nodes[A], &a2);
    assert_eq!(nodes[A].height(), 2);
    assert_eq!(nodes[A].tip_hash(), nodes[C].tip_hash());
    (genesis, vec![*a1.hash(), *a2.hash()])
}

// ========================================
// TEST 1: HEAVIER SHORT BRANCH WINS
// ========================================
#[test]
fn test_heavier_branch_replaces_local_chain() {
    println!("\n🧪 TEST 1: [10, 10] vs [25]");
    let mut nodes = network();
    let (genesis, branch_a) = build_branch_a(&mut nodes);

    let b1 = propose(&mut nodes[B], 10);
    assert_eq!(b1.block.prev_hash(), &genesis);

    let verdict = nodes[A].on_block_proposal(b1.clone(), RECEIVED_AT, &mut no_fetch).unwrap();
    assert_eq!(
        verdict,
        ProposalVerdict::Reorganized {
            depth: 2,
            tip: *b1.hash()
        }
    );
    assert_eq!(nodes[A].tip_hash(), b1.hash());
    assert_eq!(nodes[A].height(), 1);
    for dropped in &branch_a {
        assert!(!nodes[A].chain().contains(dropped));
    }
    assert_eq!(nodes[A].accumulator(), nodes[B].accumulator());
    assert!(nodes[A].own_balance().unwrap().verify(nodes[A].accumulator()));

    // The switched node keeps building on the new tip.
    let next = propose(&mut nodes[A], 12);
    assert_eq!(next.block.prev_hash(), b1.hash());
    println!("✅ node on A switched to B and extended it");
}

// ========================================
// TEST 2: EQUAL STAKE KEEPS LOCAL
// ========================================
#[test]
fn test_equal_stake_branch_is_ignored() {
    println!("\n🧪 TEST 2: [10, 10] vs [20]");
    let mut nodes = network();
    let (_, branch_a) = build_branch_a(&mut nodes);

    let d1 = propose(&mut nodes[D], 10);
    let verdict = nodes[A].on_block_proposal(d1.clone(), RECEIVED_AT, &mut no_fetch).unwrap();
    assert_eq!(verdict, ProposalVerdict::Discarded);
    assert_eq!(nodes[A].tip_hash(), branch_a.last().unwrap());
    assert!(!nodes[A].chain().contains(d1.hash()));
    assert_eq!(nodes[A].height(), 2);
    println!("✅ tie resolved in favour of the local chain");
}

// ========================================
// TEST 3: TRANSFERS ON THE LOSING BRANCH
// ========================================
#[test]
fn test_transfer_on_dropped_branch_is_undone() {
    println!("\n🧪 TEST 3: Transfer across a reorg");
    let mut nodes = network();
    let genesis = *nodes[A].tip_hash();

    // c pays a 3; a signs it and includes it in A1.
    let request = nodes[C].payment_request(*nodes[A].public_key(), 3).unwrap();
    let tx = nodes[A].accept_payment_request(&request).unwrap().unwrap();
    let a1 = propose(&mut nodes[A], 10);
    assert_eq!(a1.block.transactions().len(), 1);
    assert_eq!(nodes[A].own_balance().unwrap().money, 13);
    extend(&mut nodes[C], &a1);
    assert_eq!(nodes[C].own_balance().unwrap().money, 7);

    // A weighs 10 + 7; B alone weighs 25.
    let a2 = propose(&mut nodes[C], 11);
    extend(&mut nodes[A], &a2);
    let b1 = propose(&mut nodes[B], 10);
    assert_eq!(b1.block.prev_hash(), &genesis);
    assert!(matches!(
        nodes[A].on_block_proposal(b1.clone(), RECEIVED_AT, &mut no_fetch).unwrap(),
        ProposalVerdict::Reorganized { depth: 2, .. }
    ));
    assert_eq!(nodes[A].own_balance().unwrap().money, 10);
    assert_eq!(nodes[A].mempool_stats().size, 0);

    // B carried no transfers, so the original signature still applies.
    nodes[A].submit_transaction(tx).unwrap();
    let next = propose(&mut nodes[A], 12);
    assert_eq!(next.block.prev_hash(), b1.hash());
    assert_eq!(nodes[A].own_balance().unwrap().money, 13);
    println!("✅ transfer undone by the switch and re-applied on B");
}
