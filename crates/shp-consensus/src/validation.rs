// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - LEDGER VALIDATOR
//
// Pure, read-only checks of transactions and block proposals against an
// accumulator snapshot. Nothing here mutates state; applying is the state
// machine's job.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::error::Rejection;
use crate::params::ConsensusParams;
use shp_core::pow::{is_reward_for, meets_target};
use shp_core::{Accumulator, Block, BlockProposal, Hash, Transaction};
use std::collections::HashSet;

/// What a block needs to know about its parent.
#[derive(Debug, Clone, Copy)]
pub struct ParentView<'a> {
    pub hash: &'a Hash,
    pub index: u64,
    pub timestamp: u64,
    /// Accumulator after applying the parent.
    pub state: &'a Accumulator,
}

/// Structure, funds, both proofs and the receiver's signature.
pub fn validate_transaction(tx: &Transaction, accumulator: &Accumulator) -> Result<(), Rejection> {
    if tx.amount == 0 {
        return Err(Rejection::ZeroAmount);
    }
    if tx.sender.pos == tx.receiver.pos {
        return Err(Rejection::SelfTransfer);
    }
    if tx.amount > tx.sender.money {
        return Err(Rejection::InsufficientFunds {
            amount: tx.amount,
            money: tx.sender.money,
        });
    }
    if !tx.sender.verify(accumulator) {
        return Err(Rejection::BadProof("sender"));
    }
    if !tx.receiver.verify(accumulator) {
        return Err(Rejection::BadProof("receiver"));
    }
    if !tx.signature_valid() {
        return Err(Rejection::BadSignature);
    }
    Ok(())
}

/// [`validate_transaction`] plus the expiry rule for inclusion at `height`.
pub fn validate_transaction_at(
    tx: &Transaction,
    accumulator: &Accumulator,
    height: u64,
) -> Result<(), Rejection> {
    if height > tx.expiration {
        return Err(Rejection::Expired {
            expiration: tx.expiration,
            height,
        });
    }
    validate_transaction(tx, accumulator)
}

/// True when the block pays a third-party solver, which makes its last
/// transaction the reward.
pub fn carries_reward(block: &Block) -> bool {
    matches!(block.pow_key(), Some(k) if k != &block.proposer().public_key)
}

/// Transactions excluding a trailing work reward.
pub fn regular_transactions(block: &Block) -> &[Transaction] {
    let txs = block.transactions();
    if carries_reward(block) && !txs.is_empty() {
        &txs[..txs.len() - 1]
    } else {
        txs
    }
}

/// A received block may lead local time `now` by at most the configured drift.
pub fn validate_clock(block: &Block, params: &ConsensusParams, now: u64) -> Result<(), Rejection> {
    let limit = now.saturating_add(params.max_clock_drift_secs);
    if block.timestamp() > limit {
        return Err(Rejection::FutureTimestamp {
            limit,
            got: block.timestamp(),
        });
    }
    Ok(())
}

/// Every rule a proposal must pass, against its own snapshot.
///
/// With `parent` known locally, the snapshot must also be the parent's
/// post-state and height/timestamp must follow it.
pub fn validate_block(
    proposal: &BlockProposal,
    params: &ConsensusParams,
    parent: Option<ParentView<'_>>,
) -> Result<(), Rejection> {
    let block = &proposal.block;
    let snapshot = &proposal.snapshot;

    if block.index() == 0 {
        return Err(Rejection::GenesisProposal);
    }
    if let Some(parent) = parent {
        if block.index() != parent.index + 1 {
            return Err(Rejection::BadHeight {
                expected: parent.index + 1,
                got: block.index(),
            });
        }
        if block.timestamp() <= parent.timestamp {
            return Err(Rejection::StaleTimestamp {
                parent: parent.timestamp,
                got: block.timestamp(),
            });
        }
        if snapshot != parent.state {
            return Err(Rejection::SnapshotMismatch);
        }
    }

    // Lottery
    let proposer = block.proposer();
    if proposal.ticket.public_key() != &proposer.public_key
        || proposal.ticket.timestamp() != block.timestamp()
    {
        return Err(Rejection::TicketMismatch);
    }
    let factor = params.difficulty_factor();
    if proposal.difficulty_factor != factor {
        return Err(Rejection::DifficultyMismatch {
            expected: factor,
            got: proposal.difficulty_factor,
        });
    }
    if !proposer.verify(snapshot) {
        return Err(Rejection::BadProof("proposer"));
    }
    if !proposal.ticket.wins(proposer.money, factor) {
        return Err(Rejection::LotteryLost);
    }

    // Proof of work
    if !meets_target(block, params.pow_bits) {
        return Err(Rejection::InsufficientWork {
            bits: params.pow_bits,
        });
    }
    if carries_reward(block) {
        let reward = block.transactions().last().ok_or(Rejection::RewardRule)?;
        let miner = block.pow_key().ok_or(Rejection::RewardRule)?;
        if !is_reward_for(reward, &proposer.public_key, miner) {
            return Err(Rejection::RewardRule);
        }
    }

    // Batch limits
    let regular = regular_transactions(block).len();
    if regular > params.transactions_per_block {
        return Err(Rejection::BatchTooLarge {
            limit: params.transactions_per_block,
            got: regular,
        });
    }
    if block.new_users().len() > params.new_users_per_block {
        return Err(Rejection::BatchTooLarge {
            limit: params.new_users_per_block,
            got: block.new_users().len(),
        });
    }
    let mut users = HashSet::new();
    if !block.new_users().iter().all(|u| users.insert(*u)) {
        return Err(Rejection::DuplicateUser);
    }

    // Transactions, one write per account
    let mut touched = HashSet::new();
    for tx in block.transactions() {
        validate_transaction_at(tx, snapshot, block.index())?;
        for pos in tx.touches() {
            if !touched.insert(pos) {
                return Err(Rejection::ConflictingTransactions(pos));
            }
        }
    }
    Ok(())
}
