//! Fuzz target: block proposal validation
//!
//! Decodes arbitrary JSON as a `BlockProposal` and runs the stateless
//! checks against it. Validation must reject, never panic.
//!
//! Run: cargo +nightly fuzz run fuzz_proposal_validate -- -max_len=16384

#![no_main]
use libfuzzer_sys::fuzz_target;
use shp_consensus::validation::validate_block;
use shp_consensus::{ConsensusParams, DifficultyPolicy};
use shp_core::{decode, BlockProposal};

fuzz_target!(|data: &[u8]| {
    let Ok(proposal) = decode::<BlockProposal>(data) else {
        return;
    };
    let _ = proposal.hash();
    let _ = proposal.block.stake();

    let _ = validate_block(&proposal, &ConsensusParams::default(), None);
    let lenient = ConsensusParams {
        difficulty: DifficultyPolicy::Fixed { factor: u128::MAX },
        ..Default::default()
    };
    let _ = validate_block(&proposal, &lenient, None);
});
