//! Fuzz target: accumulator proofs
//!
//! Inserts a random number of leaves while refreshing every holder's proof,
//! then checks all of them verify and that forged proofs never panic.
//!
//! Run: cargo +nightly fuzz run fuzz_accumulator

#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shp_core::accumulator::Accumulator;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    leaves: Vec<[u8; 32]>,
    forged_pos: u64,
    forged_proof: Vec<[u8; 32]>,
    snapshot_n: u64,
    snapshot_roots: Vec<[u8; 32]>,
}

fuzz_target!(|input: FuzzInput| {
    let mut acc = Accumulator::new();
    let mut held: Vec<(u64, Vec<[u8; 32]>)> = Vec::new();
    // Bound the work; refresh is quadratic in the holder count.
    for leaf in input.leaves.iter().take(256) {
        let witnesses = held.iter_mut().map(|(pos, proof)| (*pos, proof));
        let (pos, proof) = acc.insert_refreshing(leaf, witnesses).expect("insert within capacity");
        held.push((pos, proof));
    }
    for ((pos, proof), leaf) in held.iter().zip(&input.leaves) {
        assert!(acc.verify(leaf, *pos, proof));
    }

    if let Some(leaf) = input.leaves.first() {
        let _ = acc.verify(leaf, input.forged_pos, &input.forged_proof);
    }
    if let Ok(snapshot) = Accumulator::from_parts(input.snapshot_n, input.snapshot_roots) {
        let _ = snapshot.verify(&[0u8; 32], input.forged_pos, &input.forged_proof);
    }
});
