// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - FORK CHOICE
//
// Stake-weighted comparison of a competing branch against the local one.
// - Walk the candidate's ancestry back to a block on the local chain,
//   fetching unknown parents through a BlockFetcher
// - Sum proposer stake on both sides of the common ancestor
// - Strictly more stake on the new side means reorganize
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::chain::ChainIndex;
use crate::error::LedgerError;
use shp_core::encoding::short_hex;
use shp_core::{BlockProposal, Hash};

/// Synchronous source of blocks missing locally.
pub trait BlockFetcher {
    fn fetch_block(&mut self, hash: &Hash) -> Option<BlockProposal>;
}

impl<F> BlockFetcher for F
where
    F: FnMut(&Hash) -> Option<BlockProposal>,
{
    fn fetch_block(&mut self, hash: &Hash) -> Option<BlockProposal> {
        self(hash)
    }
}

/// A fetcher that knows nothing.
pub fn no_fetch(_: &Hash) -> Option<BlockProposal> {
    None
}

#[derive(Debug, Clone)]
pub struct Reorg {
    pub ancestor: Hash,
    /// New branch, oldest first, ending with the candidate.
    pub branch: Vec<BlockProposal>,
    pub old_stake: u64,
    pub new_stake: u64,
    /// Local blocks that would be dropped.
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub enum ForkDecision {
    Keep { old_stake: u64, new_stake: u64 },
    Reorg(Reorg),
}

/// Decide between the local chain and the branch ending at `candidate`.
pub fn evaluate(
    chain: &ChainIndex,
    candidate: &BlockProposal,
    fetcher: &mut dyn BlockFetcher,
    max_depth: usize,
) -> Result<ForkDecision, LedgerError> {
    let mut branch = vec![candidate.clone()];
    let mut cursor = *candidate.block.prev_hash();
    while !chain.contains(&cursor) {
        if branch.len() > max_depth {
            return Err(LedgerError::MissingAncestor(cursor));
        }
        let parent = fetcher
            .fetch_block(&cursor)
            .ok_or(LedgerError::MissingAncestor(cursor))?;
        if parent.hash() != &cursor {
            return Err(LedgerError::Malformed(format!(
                "asked for block {}, got {}",
                short_hex(&cursor),
                short_hex(parent.hash())
            )));
        }
        log::debug!("🔍 Fetched ancestor #{} {}", parent.block.index(), short_hex(&cursor));
        cursor = *parent.block.prev_hash();
        branch.push(parent);
    }
    branch.reverse();

    let mut old_stake = 0u64;
    let mut depth = 0usize;
    for entry in chain.ancestry(chain.tip()) {
        if entry.hash() == &cursor {
            break;
        }
        old_stake = old_stake.saturating_add(entry.block.stake());
        depth += 1;
    }
    let new_stake = branch
        .iter()
        .fold(0u64, |acc, p| acc.saturating_add(p.block.stake()));

    if new_stake > old_stake {
        Ok(ForkDecision::Reorg(Reorg {
            ancestor: cursor,
            branch,
            old_stake,
            new_stake,
            depth,
        }))
    } else {
        Ok(ForkDecision::Keep {
            old_stake,
            new_stake,
        })
    }
}
