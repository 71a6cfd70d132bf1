// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - BLOCK PROPOSAL ENVELOPE
//
// What a lottery winner broadcasts: its ticket, the difficulty factor it
// played under, the accumulator it built on (n, roots), and the block.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::accumulator::Accumulator;
use crate::block::Block;
use crate::encoding::{b64_hashes, u128_string, EncodingError};
use crate::lottery::LotteryTicket;
use serde::{Deserialize, Serialize};
use shp_crypto::Hash;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProposalWire", into = "ProposalWire")]
pub struct BlockProposal {
    pub ticket: LotteryTicket,
    pub difficulty_factor: u128,
    /// Accumulator state the block applies on top of.
    pub snapshot: Accumulator,
    pub block: Block,
}

#[derive(Serialize, Deserialize)]
struct ProposalWire {
    heart: LotteryTicket,
    #[serde(with = "u128_string")]
    difficulty_factor: u128,
    #[serde(with = "b64_hashes")]
    roots: Vec<Hash>,
    n: u64,
    block: Block,
}

impl TryFrom<ProposalWire> for BlockProposal {
    type Error = EncodingError;

    fn try_from(wire: ProposalWire) -> Result<Self, Self::Error> {
        let snapshot = Accumulator::from_parts(wire.n, wire.roots)
            .map_err(|e| EncodingError::Inconsistent(e.to_string()))?;
        Ok(BlockProposal {
            ticket: wire.heart,
            difficulty_factor: wire.difficulty_factor,
            snapshot,
            block: wire.block,
        })
    }
}

impl From<BlockProposal> for ProposalWire {
    fn from(p: BlockProposal) -> Self {
        ProposalWire {
            heart: p.ticket,
            difficulty_factor: p.difficulty_factor,
            n: p.snapshot.len(),
            roots: p.snapshot.roots().to_vec(),
            block: p.block,
        }
    }
}

impl BlockProposal {
    pub fn hash(&self) -> &Hash {
        self.block.hash()
    }
}
