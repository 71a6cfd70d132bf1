// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - CHAIN INDEX
//
// Arena of committed blocks keyed by hash, linked through prev_hash.
// - Holds the adopted chain only; competing branches live elsewhere
// - Each entry keeps the accumulator before and after it, so a reorg
//   can rewind to any retained ancestor and replay
// - Entries deeper than the fork-walk bound are pruned
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::validation::ParentView;
use serde::{Deserialize, Serialize};
use shp_core::encoding::{short_hex, u128_string};
use shp_core::{Accumulator, BalanceInfo, Block, BlockProposal, Hash, LotteryTicket};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub block: Block,
    /// Absent for genesis only.
    pub ticket: Option<LotteryTicket>,
    #[serde(with = "u128_string")]
    pub difficulty_factor: u128,
    pub pre_state: Accumulator,
    pub post_state: Accumulator,
    /// This node's own account after the block, once registered.
    pub account: Option<BalanceInfo>,
}

impl ChainEntry {
    pub fn hash(&self) -> &Hash {
        self.block.hash()
    }

    /// This entry as the parent of the next block.
    pub fn view(&self) -> ParentView<'_> {
        ParentView {
            hash: self.block.hash(),
            index: self.block.index(),
            timestamp: self.block.timestamp(),
            state: &self.post_state,
        }
    }

    /// The envelope peers need to validate this block themselves.
    pub fn proposal(&self) -> Option<BlockProposal> {
        self.ticket.as_ref().map(|ticket| BlockProposal {
            ticket: ticket.clone(),
            difficulty_factor: self.difficulty_factor,
            snapshot: self.pre_state.clone(),
            block: self.block.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChainIndex {
    entries: HashMap<Hash, ChainEntry>,
    tip: Hash,
}

impl ChainIndex {
    /// Start from a root entry (genesis or an adopted base).
    pub fn new(root: ChainEntry) -> Self {
        let tip = *root.hash();
        let mut entries = HashMap::new();
        entries.insert(tip, root);
        Self { entries, tip }
    }

    /// Rebuild from entries ordered oldest first. Each must extend the previous.
    pub fn from_entries(mut ordered: Vec<ChainEntry>) -> Result<Self, String> {
        if ordered.is_empty() {
            return Err("chain has no entries".to_string());
        }
        let rest = ordered.split_off(1);
        let mut chain = ChainIndex::new(ordered.remove(0));
        for entry in rest {
            chain.push(entry)?;
        }
        Ok(chain)
    }

    pub fn get(&self, hash: &Hash) -> Option<&ChainEntry> {
        self.entries.get(hash)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn tip(&self) -> &Hash {
        &self.tip
    }

    pub fn tip_entry(&self) -> &ChainEntry {
        // The tip is inserted before it is ever named, and never pruned.
        &self.entries[&self.tip]
    }

    pub fn height(&self) -> u64 {
        self.tip_entry().block.index()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry on top of the tip.
    pub fn push(&mut self, entry: ChainEntry) -> Result<(), String> {
        if entry.block.prev_hash() != &self.tip {
            return Err(format!(
                "block {} does not extend tip {}",
                short_hex(entry.hash()),
                short_hex(&self.tip)
            ));
        }
        let hash = *entry.hash();
        self.entries.insert(hash, entry);
        self.tip = hash;
        Ok(())
    }

    /// Walk from `from` towards the root, newest first.
    pub fn ancestry<'a>(&'a self, from: &Hash) -> impl Iterator<Item = &'a ChainEntry> + 'a {
        let mut cursor = self.entries.get(from);
        std::iter::from_fn(move || {
            let current = cursor?;
            cursor = self.entries.get(current.block.prev_hash());
            Some(current)
        })
    }

    /// Detach everything above `ancestor`, returning it newest first.
    pub fn rewind_to(&mut self, ancestor: &Hash) -> Result<Vec<ChainEntry>, String> {
        if !self.contains(ancestor) {
            return Err(format!("{} is not on the chain", short_hex(ancestor)));
        }
        let mut removed = Vec::new();
        while &self.tip != ancestor {
            let Some(entry) = self.entries.remove(&self.tip) else {
                return Err(format!("broken link at {}", short_hex(&self.tip)));
            };
            self.tip = *entry.block.prev_hash();
            removed.push(entry);
        }
        Ok(removed)
    }

    /// Drop entries more than `keep` blocks behind the tip.
    pub fn prune(&mut self, keep: usize) -> usize {
        let keep_hashes: Vec<Hash> = self.ancestry(&self.tip).take(keep + 1).map(|e| *e.hash()).collect();
        let before = self.entries.len();
        self.entries.retain(|h, _| keep_hashes.contains(h));
        before - self.entries.len()
    }

    /// Entries oldest first, for persistence.
    pub fn ordered(&self) -> Vec<&ChainEntry> {
        let mut out: Vec<&ChainEntry> = self.ancestry(&self.tip).collect();
        out.reverse();
        out
    }
}
