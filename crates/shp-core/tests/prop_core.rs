// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROPERTY-BASED TESTS - shp-core
//
// Accumulator and record invariants that must hold for all inputs:
// - shape follows the binary representation of n
// - fresh proofs verify, any single-bit corruption does not
// - updates move the committed value
// - canonical encoding preserves recomputed hashes
//
// Run: cargo test --release -p shp-core --test prop_core
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use proptest::prelude::*;
use shp_core::accumulator::Accumulator;
use shp_core::{canonical_bytes, decode, BalanceInfo, Block, Hash, PublicKey, Transaction};

fn arb_hash() -> impl Strategy<Value = Hash> {
    any::<[u8; 32]>()
}

fn arb_key() -> impl Strategy<Value = PublicKey> {
    any::<[u8; 32]>().prop_map(PublicKey)
}

fn arb_balance() -> impl Strategy<Value = BalanceInfo> {
    (arb_key(), any::<u64>(), any::<u64>(), prop::collection::vec(arb_hash(), 0..6))
        .prop_map(|(k, m, p, b)| BalanceInfo::new(k, m, p, b))
}

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (
        1u64..1_000_000,
        any::<u64>(),
        arb_balance(),
        arb_balance(),
        prop::collection::vec(any::<u8>(), 0..64),
    )
        .prop_map(|(amount, expiration, sender, receiver, signature)| {
            let mut tx = Transaction::unsigned(amount, expiration, sender, receiver);
            tx.signature = signature;
            tx
        })
}

/// Insert every leaf, keeping every path fresh.
fn build(leaves: &[Hash]) -> (Accumulator, Vec<Vec<Hash>>) {
    let mut acc = Accumulator::new();
    let mut proofs: Vec<Vec<Hash>> = Vec::new();
    for (i, leaf) in leaves.iter().enumerate() {
        let (pos, proof) = acc
            .insert_refreshing(
                leaf,
                proofs.iter_mut().enumerate().map(|(p, w)| (p as u64, w)),
            )
            .unwrap();
        assert_eq!(pos, i as u64);
        proofs.push(proof);
    }
    (acc, proofs)
}

// ─────────────────────────────────────────────────────────────────
// ACCUMULATOR PROPERTIES
// ─────────────────────────────────────────────────────────────────

proptest! {
    /// PROPERTY: k inserts give n = k and popcount(n) roots
    #[test]
    fn prop_shape_matches_count(leaves in prop::collection::vec(arb_hash(), 0..130)) {
        let (acc, _) = build(&leaves);
        prop_assert_eq!(acc.len(), leaves.len() as u64);
        prop_assert_eq!(acc.roots().len(), acc.len().count_ones() as usize);
    }

    /// PROPERTY: the proof returned by insert verifies immediately
    #[test]
    fn prop_fresh_insert_verifies(
        leaves in prop::collection::vec(arb_hash(), 0..64),
        extra in arb_hash(),
    ) {
        let (mut acc, _) = build(&leaves);
        let (pos, proof) = acc.insert(&extra).unwrap();
        prop_assert!(acc.verify(&extra, pos, &proof));
    }

    /// PROPERTY: refreshed proofs of every earlier leaf keep verifying
    #[test]
    fn prop_refreshed_proofs_verify(leaves in prop::collection::vec(arb_hash(), 1..80)) {
        let (acc, proofs) = build(&leaves);
        for (i, leaf) in leaves.iter().enumerate() {
            prop_assert!(acc.verify(leaf, i as u64, &proofs[i]));
        }
    }

    /// PROPERTY: flipping one bit of data, position or a proof entry breaks verify
    #[test]
    fn prop_single_bit_flip_fails(
        leaves in prop::collection::vec(arb_hash(), 2..64),
        pick in any::<prop::sample::Index>(),
        byte in 0usize..32,
        bit in 0u8..8,
        pos_bit in 0u32..64,
    ) {
        let (acc, proofs) = build(&leaves);
        let i = pick.index(leaves.len());
        let pos = i as u64;

        let mut data = leaves[i];
        data[byte] ^= 1 << bit;
        prop_assert!(!acc.verify(&data, pos, &proofs[i]));

        prop_assert!(!acc.verify(&leaves[i], pos ^ (1u64 << pos_bit), &proofs[i]));

        if !proofs[i].is_empty() {
            let mut proof = proofs[i].clone();
            let entry = byte % proof.len();
            proof[entry][byte] ^= 1 << bit;
            prop_assert!(!acc.verify(&leaves[i], pos, &proof));
        }
    }

    /// PROPERTY: after update, the new value verifies and the old one does not
    #[test]
    fn prop_update_moves_commitment(
        leaves in prop::collection::vec(arb_hash(), 1..64),
        pick in any::<prop::sample::Index>(),
        fresh in arb_hash(),
    ) {
        let (mut acc, proofs) = build(&leaves);
        let i = pick.index(leaves.len());
        prop_assume!(fresh != leaves[i]);
        acc.update(&fresh, i as u64, &proofs[i]).unwrap();
        prop_assert!(acc.verify(&fresh, i as u64, &proofs[i]));
        prop_assert!(!acc.verify(&leaves[i], i as u64, &proofs[i]));
    }
}

// ─────────────────────────────────────────────────────────────────
// ENCODING PROPERTIES
// ─────────────────────────────────────────────────────────────────

proptest! {
    /// PROPERTY: BalanceInfo round-trips with the same leaf data
    #[test]
    fn prop_balance_roundtrip(info in arb_balance()) {
        let back: BalanceInfo = decode(&canonical_bytes(&info).unwrap()).unwrap();
        prop_assert_eq!(back.data(), info.data());
        prop_assert_eq!(back, info);
    }

    /// PROPERTY: Transaction round-trips with the same hash
    #[test]
    fn prop_transaction_roundtrip(tx in arb_transaction()) {
        let back: Transaction = decode(&canonical_bytes(&tx).unwrap()).unwrap();
        prop_assert_eq!(back.hash(), tx.hash());
        prop_assert_eq!(back, tx);
    }

    /// PROPERTY: Block round-trips with the same med_hash and hash
    #[test]
    fn prop_block_roundtrip(
        index in any::<u64>(),
        prev in arb_hash(),
        proposer in arb_balance(),
        txs in prop::collection::vec(arb_transaction(), 0..4),
        users in prop::collection::vec(arb_key(), 0..4),
        timestamp in any::<u64>(),
        pow in proptest::option::of((arb_key(), any::<u64>())),
    ) {
        let mut block = Block::new(index, prev, proposer, txs, users, timestamp);
        if let Some((key, nonce)) = pow {
            block = block.with_work(Some(key), nonce);
        }
        let bytes = canonical_bytes(&block).unwrap();
        let back: Block = decode(&bytes).unwrap();
        prop_assert_eq!(back.med_hash(), block.med_hash());
        prop_assert_eq!(back.hash(), block.hash());
        prop_assert_eq!(canonical_bytes(&back).unwrap(), bytes);
    }
}
