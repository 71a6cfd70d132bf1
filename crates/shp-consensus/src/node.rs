// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - NODE STATE MACHINE
//
// The one owned value holding everything a node mutates:
// - Accumulator at the tip, chain index, account registry
// - Pending transactions and admissions
// - The node's own account and its refreshed proof
// - The best candidate block seen for the next height
//
// Unregistered → Registered once a block carrying our key in new_users is
// applied. Every mutation goes through &mut self; the caller serializes.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::chain::{ChainEntry, ChainIndex};
use crate::error::{IntegrityViolation, LedgerError, Rejection};
use crate::fork::{self, BlockFetcher, ForkDecision, Reorg};
use crate::mempool::{Mempool, MempoolStats};
use crate::params::ConsensusParams;
use crate::registry::AccountRegistry;
use crate::validation::{validate_block, validate_clock, validate_transaction_at};
use serde::{Deserialize, Serialize};
use shp_core::encoding::short_hex;
use shp_core::pow::{meets_target, solve};
use shp_core::{
    balance_data, canonical_bytes, Accumulator, BalanceInfo, Block, BlockProposal, Hash,
    LotteryTicket, PublicKey, Transaction,
};
use shp_crypto::KeyPair;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;

// ─────────────────────────────────────────────────────────────
// PUBLIC TYPES
// ─────────────────────────────────────────────────────────────

/// One pre-funded account of the genesis allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub public_key: PublicKey,
    pub money: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Unregistered,
    Registered { pos: u64 },
}

#[derive(Debug, Clone)]
pub enum ProposeOutcome {
    /// Committed locally; broadcast it.
    Proposed(BlockProposal),
    /// Won the lottery but the block still misses the work target.
    PendingWork,
    LostLottery,
    /// Nothing to put in a block.
    Idle,
    NotRegistered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposalVerdict {
    /// Now the best candidate for the next height.
    Buffered,
    Duplicate,
    /// Valid, but loses to the local candidate or chain.
    Discarded,
    Reorganized { depth: usize, tip: Hash },
    /// A fresh node took the proposal's snapshot as its base.
    Adopted(Hash),
}

/// What a payer sends to a receiver so it can build and sign the transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: u64,
    pub sender: BalanceInfo,
    pub receiver: PublicKey,
}

/// Everything worth keeping across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    /// Oldest first.
    pub entries: Vec<ChainEntry>,
    pub registry: AccountRegistry,
}

/// State after applying a block, not yet installed.
struct Applied {
    accumulator: Accumulator,
    account: Option<BalanceInfo>,
    registry: AccountRegistry,
    mempool: Mempool,
}

struct PendingWork {
    proposal: BlockProposal,
    next_nonce: u64,
}

// ─────────────────────────────────────────────────────────────
// NODE STATE
// ─────────────────────────────────────────────────────────────

pub struct NodeState {
    params: ConsensusParams,
    keypair: KeyPair,
    public_key: PublicKey,
    chain: ChainIndex,
    /// Always equal to the tip entry's post-state.
    accumulator: Accumulator,
    registry: AccountRegistry,
    mempool: Mempool,
    account: Option<BalanceInfo>,
    round_candidate: Option<BlockProposal>,
    pending_work: Option<PendingWork>,
}

impl NodeState {
    /// Start from genesis: allocate the configured accounts in order.
    pub fn new(
        params: ConsensusParams,
        keypair: KeyPair,
        genesis: &[GenesisAccount],
    ) -> Result<Self, LedgerError> {
        let public_key = PublicKey::from_slice(&keypair.public_key)?;
        let mut accumulator = Accumulator::new();
        let mut registry = AccountRegistry::new();
        let mut account: Option<BalanceInfo> = None;

        for entry in genesis {
            if registry.contains(&entry.public_key) {
                return Err(LedgerError::Malformed(format!(
                    "genesis lists {} twice",
                    entry.public_key
                )));
            }
            let data = balance_data(&entry.public_key, entry.money);
            let (pos, proof) =
                accumulator.insert_refreshing(&data, account.iter_mut().map(|a| a.witness()))?;
            registry.register(pos, entry.public_key);
            if entry.public_key == public_key {
                account = Some(BalanceInfo::new(public_key, entry.money, pos, proof));
            }
        }

        let root = ChainEntry {
            block: Block::genesis(),
            ticket: None,
            difficulty_factor: params.difficulty_factor(),
            pre_state: Accumulator::new(),
            post_state: accumulator.clone(),
            account: account.clone(),
        };
        log::info!(
            "🌱 Genesis: {} accounts, {} roots, we are {}",
            registry.len(),
            accumulator.roots().len(),
            if account.is_some() { "funded" } else { "unregistered" }
        );
        Ok(Self::assemble(params, keypair, public_key, ChainIndex::new(root), registry))
    }

    /// Resume from a persisted chain.
    pub fn restore(
        params: ConsensusParams,
        keypair: KeyPair,
        state: PersistedState,
    ) -> Result<Self, LedgerError> {
        let public_key = PublicKey::from_slice(&keypair.public_key)?;
        let chain = ChainIndex::from_entries(state.entries).map_err(LedgerError::Malformed)?;
        let mut registry = state.registry;
        registry.reindex();
        log::info!(
            "♻️ Restored chain at #{} ({} entries)",
            chain.height(),
            chain.len()
        );
        Ok(Self::assemble(params, keypair, public_key, chain, registry))
    }

    fn assemble(
        params: ConsensusParams,
        keypair: KeyPair,
        public_key: PublicKey,
        chain: ChainIndex,
        registry: AccountRegistry,
    ) -> Self {
        let tip = chain.tip_entry();
        let accumulator = tip.post_state.clone();
        let account = tip.account.clone();
        let mut mempool = Mempool::new(params.mempool_capacity, params.admission_capacity);
        if account.is_none() {
            // Our own admission rides along with the ones we relay.
            let _ = mempool.add_admission(public_key);
        }
        Self {
            params,
            keypair,
            public_key,
            chain,
            accumulator,
            registry,
            mempool,
            account,
            round_candidate: None,
            pending_work: None,
        }
    }

    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            entries: self.chain.ordered().into_iter().cloned().collect(),
            registry: self.registry.clone(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // APPLY / COMMIT
    // ─────────────────────────────────────────────────────────────

    /// Apply a block on top of the current accumulator without touching `self`.
    ///
    /// New users are inserted first, then every transaction rewrites its
    /// sender and receiver leaves. Each step refreshes the proofs still in
    /// play: our account, the block's later transactions and the mempool.
    fn apply_block(&self, block: &Block) -> Result<Applied, LedgerError> {
        let mut accumulator = self.accumulator.clone();
        let mut account = self.account.clone();
        let mut registry = self.registry.clone();
        let mut mempool = self.mempool.clone();
        let mut txs: Vec<Transaction> = block.transactions().to_vec();

        for key in block.new_users() {
            let witnesses = account
                .iter_mut()
                .map(|a| a.witness())
                .chain(txs.iter_mut().flat_map(|t| t.witnesses()))
                .chain(mempool.witnesses_mut());
            let (pos, proof) = accumulator.insert_refreshing(&balance_data(key, 0), witnesses)?;
            registry.register(pos, *key);
            if *key == self.public_key && account.is_none() {
                account = Some(BalanceInfo::new(*key, 0, pos, proof));
            }
        }

        for i in 0..txs.len() {
            let Some((tx, later)) = txs[i..].split_first_mut() else {
                break;
            };
            let amount = tx.amount;
            let Transaction {
                sender, receiver, ..
            } = tx;
            let sender_money = sender
                .money
                .checked_sub(amount)
                .ok_or(Rejection::InsufficientFunds {
                    amount,
                    money: sender.money,
                })?;
            let receiver_money = receiver
                .money
                .checked_add(amount)
                .ok_or(Rejection::BalanceOverflow)?;

            let new_sender = balance_data(&sender.public_key, sender_money);
            accumulator.replace_refreshing(
                &sender.data(),
                &new_sender,
                sender.pos,
                &sender.brolist,
                account
                    .iter_mut()
                    .map(|a| a.witness())
                    .chain(std::iter::once(receiver.witness()))
                    .chain(later.iter_mut().flat_map(|t| t.witnesses()))
                    .chain(mempool.witnesses_mut()),
            )?;
            sender.money = sender_money;

            let new_receiver = balance_data(&receiver.public_key, receiver_money);
            accumulator.replace_refreshing(
                &receiver.data(),
                &new_receiver,
                receiver.pos,
                &receiver.brolist,
                account
                    .iter_mut()
                    .map(|a| a.witness())
                    .chain(std::iter::once(sender.witness()))
                    .chain(later.iter_mut().flat_map(|t| t.witnesses()))
                    .chain(mempool.witnesses_mut()),
            )?;
            receiver.money = receiver_money;

            if let Some(own) = account.as_mut() {
                if own.pos == sender.pos {
                    own.money = sender.money;
                } else if own.pos == receiver.pos {
                    own.money = receiver.money;
                }
            }
        }

        Ok(Applied {
            accumulator,
            account,
            registry,
            mempool,
        })
    }

    /// Apply a validated proposal that extends the tip and make it the new tip.
    fn commit_proposal(&mut self, proposal: &BlockProposal) -> Result<Hash, LedgerError> {
        let block = &proposal.block;
        if block.prev_hash() != self.chain.tip() {
            return Err(Rejection::DetachedBlock.into());
        }
        let applied = self.apply_block(block)?;
        let hash = *block.hash();
        let was_registered = self.account.is_some();

        self.chain
            .push(ChainEntry {
                block: block.clone(),
                ticket: Some(proposal.ticket.clone()),
                difficulty_factor: proposal.difficulty_factor,
                pre_state: self.accumulator.clone(),
                post_state: applied.accumulator.clone(),
                account: applied.account.clone(),
            })
            .map_err(LedgerError::Malformed)?;
        self.accumulator = applied.accumulator;
        self.account = applied.account;
        self.registry = applied.registry;
        self.mempool = applied.mempool;
        self.round_candidate = None;

        self.mempool.remove_included(block);
        let swept = self
            .mempool
            .retain_valid(&self.accumulator, block.index() + 1);
        let pruned = self.chain.prune(self.params.max_fork_depth);

        log::info!(
            "📦 Block #{} {} committed ({} txs, {} new users, proposer stake {})",
            block.index(),
            short_hex(&hash),
            block.transactions().len(),
            block.new_users().len(),
            block.stake()
        );
        if swept > 0 || pruned > 0 {
            log::debug!("🗑️ Swept {} stale transactions, pruned {} entries", swept, pruned);
        }
        if !was_registered {
            if let Some(own) = &self.account {
                log::info!("🤝 Registered at position {}", own.pos);
            }
        }
        Ok(hash)
    }

    // ─────────────────────────────────────────────────────────────
    // PROPOSING
    // ─────────────────────────────────────────────────────────────

    /// One proposal attempt at wall-clock second `now`.
    ///
    /// Draws a ticket for every second of the lottery window after the tip,
    /// keeps the lowest, and builds a block if it wins.
    pub fn propose(&mut self, now: u64) -> Result<ProposeOutcome, LedgerError> {
        if self.pending_work.is_some() {
            return Ok(ProposeOutcome::PendingWork);
        }
        let Some(account) = self.account.clone() else {
            return Ok(ProposeOutcome::NotRegistered);
        };
        if !self.params.propose_empty_blocks && !self.mempool.has_work() {
            return Ok(ProposeOutcome::Idle);
        }

        let tip = self.chain.tip_entry();
        let window = self.params.lottery_window_secs.max(1);
        // No second is left after a tip stamped at the end of time.
        let Some(earliest) = tip.block.timestamp().checked_add(1) else {
            return Ok(ProposeOutcome::LostLottery);
        };
        let start = earliest.max(now.saturating_sub(window - 1));
        if start > now {
            return Ok(ProposeOutcome::LostLottery);
        }
        let factor = self.params.difficulty_factor();
        let Some(ticket) = LotteryTicket::best_in(start..=now, self.public_key) else {
            return Ok(ProposeOutcome::LostLottery);
        };
        if !ticket.wins(account.money, factor) {
            return Ok(ProposeOutcome::LostLottery);
        }

        let height = tip.block.index() + 1;
        let transactions: Vec<Transaction> = self
            .mempool
            .select_batch(self.params.transactions_per_block, &HashSet::new())
            .into_iter()
            .filter(|tx| validate_transaction_at(tx, &self.accumulator, height).is_ok())
            .collect();
        let new_users: Vec<PublicKey> = self
            .mempool
            .select_admissions(self.params.new_users_per_block)
            .into_iter()
            .filter(|key| !self.registry.contains(key))
            .collect();
        let block = Block::new(
            height,
            *tip.hash(),
            account,
            transactions,
            new_users,
            ticket.timestamp(),
        );
        let proposal = BlockProposal {
            ticket,
            difficulty_factor: factor,
            snapshot: self.accumulator.clone(),
            block,
        };

        if !meets_target(&proposal.block, self.params.pow_bits) {
            log::debug!(
                "⛏️ Won #{} but hash misses {} bits, solving",
                height,
                self.params.pow_bits
            );
            self.pending_work = Some(PendingWork {
                proposal,
                next_nonce: 0,
            });
            return Ok(ProposeOutcome::PendingWork);
        }
        self.seal_own(&proposal)?;
        Ok(ProposeOutcome::Proposed(proposal))
    }

    /// Spend up to `attempts` hashes on the block waiting for work.
    ///
    /// The solver key is our own, so no reward transaction is needed.
    pub fn work_on_pending(
        &mut self,
        attempts: u64,
        cancel: &AtomicBool,
    ) -> Result<Option<BlockProposal>, LedgerError> {
        let Some(mut work) = self.pending_work.take() else {
            return Ok(None);
        };
        if work.proposal.block.prev_hash() != self.chain.tip() {
            log::debug!("🗑️ Tip moved, dropping unsolved block #{}", work.proposal.block.index());
            return Ok(None);
        }
        match solve(
            &work.proposal.block,
            self.public_key,
            self.params.pow_bits,
            work.next_nonce,
            attempts,
            cancel,
        ) {
            Some(block) => {
                let proposal = BlockProposal {
                    block,
                    ..work.proposal
                };
                self.seal_own(&proposal)?;
                Ok(Some(proposal))
            }
            None => {
                work.next_nonce = work.next_nonce.wrapping_add(attempts);
                self.pending_work = Some(work);
                Ok(None)
            }
        }
    }

    fn seal_own(&mut self, proposal: &BlockProposal) -> Result<(), LedgerError> {
        validate_block(proposal, &self.params, Some(self.chain.tip_entry().view()))?;
        self.commit_proposal(proposal)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // RECEIVING
    // ─────────────────────────────────────────────────────────────

    /// Handle a proposal from a peer, received at local second `now`.
    pub fn on_block_proposal(
        &mut self,
        proposal: BlockProposal,
        now: u64,
        fetcher: &mut dyn BlockFetcher,
    ) -> Result<ProposalVerdict, LedgerError> {
        let hash = *proposal.hash();
        validate_clock(&proposal.block, &self.params, now)?;

        let known = self
            .chain
            .get(&hash)
            .map(|e| &e.block)
            .or_else(|| {
                self.round_candidate
                    .as_ref()
                    .filter(|c| c.hash() == &hash)
                    .map(|c| &c.block)
            });
        if let Some(existing) = known {
            // Block hashes skip signatures; a tampered copy fails here.
            let parent = self.chain.get(proposal.block.prev_hash()).map(|e| e.view());
            validate_block(&proposal, &self.params, parent)?;
            if canonical_bytes(&existing.transactions())? == canonical_bytes(&proposal.block.transactions())? {
                return Ok(ProposalVerdict::Duplicate);
            }
            return Err(IntegrityViolation::Equivocation(hash).into());
        }

        // A block on top of the buffered candidate settles the previous round.
        if matches!(&self.round_candidate, Some(c) if c.hash() == proposal.block.prev_hash()) {
            self.finalize_round()?;
        }

        if self.is_foreign_genesis(&proposal) {
            validate_block(&proposal, &self.params, None)?;
            return self.adopt(&proposal);
        }

        if proposal.block.prev_hash() == self.chain.tip() {
            validate_block(&proposal, &self.params, Some(self.chain.tip_entry().view()))?;
            let better = match &self.round_candidate {
                Some(current) => proposal.ticket.value() < current.ticket.value(),
                None => true,
            };
            if !better {
                return Ok(ProposalVerdict::Discarded);
            }
            log::debug!(
                "🎟️ Candidate for #{}: {} from {}",
                proposal.block.index(),
                short_hex(&hash),
                proposal.block.proposer().public_key
            );
            self.round_candidate = Some(proposal);
            return Ok(ProposalVerdict::Buffered);
        }

        let parent = self.chain.get(proposal.block.prev_hash()).map(|e| e.view());
        validate_block(&proposal, &self.params, parent)?;

        match fork::evaluate(&self.chain, &proposal, fetcher, self.params.max_fork_depth) {
            Ok(ForkDecision::Reorg(reorg))
                if reorg.branch.first().is_some_and(|b| self.is_foreign_genesis(b)) =>
            {
                self.adopt(&proposal)
            }
            Ok(ForkDecision::Reorg(reorg)) => self.reorganize(reorg),
            Ok(ForkDecision::Keep {
                old_stake,
                new_stake,
            }) => {
                log::info!(
                    "🗑️ Fork or stale block #{} ignored (stake {} vs local {})",
                    proposal.block.index(),
                    new_stake,
                    old_stake
                );
                Ok(ProposalVerdict::Discarded)
            }
            Err(LedgerError::MissingAncestor(_)) if self.chain.height() == 0 => {
                self.adopt(&proposal)
            }
            Err(e) => Err(e),
        }
    }

    /// We never got past genesis and `first`, a child of our genesis block,
    /// was built on another allocation.
    fn is_foreign_genesis(&self, first: &BlockProposal) -> bool {
        self.chain.height() == 0
            && first.block.prev_hash() == self.chain.tip()
            && first.snapshot != self.chain.tip_entry().post_state
    }

    /// Commit the buffered candidate at a round boundary.
    pub fn finalize_round(&mut self) -> Result<Option<Hash>, LedgerError> {
        let Some(candidate) = self.round_candidate.take() else {
            return Ok(None);
        };
        if candidate.block.prev_hash() != self.chain.tip() {
            log::debug!("🗑️ Candidate {} no longer extends the tip", short_hex(candidate.hash()));
            return Ok(None);
        }
        self.commit_proposal(&candidate).map(Some)
    }

    /// Rewind to the common ancestor and replay the heavier branch.
    ///
    /// All-or-nothing: a failure anywhere restores the previous state.
    fn reorganize(&mut self, reorg: Reorg) -> Result<ProposalVerdict, LedgerError> {
        let saved_chain = self.chain.clone();
        let saved_accumulator = self.accumulator.clone();
        let saved_account = self.account.clone();
        let saved_registry = self.registry.clone();
        let saved_mempool = self.mempool.clone();

        match self.replay(&reorg) {
            Ok(removed) => {
                // Admissions from dropped blocks go back in the queue.
                for entry in &removed {
                    for key in entry.block.new_users() {
                        if !self.registry.contains(key) {
                            let _ = self.mempool.add_admission(*key);
                        }
                    }
                }
                self.round_candidate = None;
                self.pending_work = None;
                let tip = *self.chain.tip();
                log::info!(
                    "🔀 Reorg: dropped {} blocks (stake {}) for {} (stake {}), tip #{} {}",
                    reorg.depth,
                    reorg.old_stake,
                    reorg.branch.len(),
                    reorg.new_stake,
                    self.chain.height(),
                    short_hex(&tip)
                );
                Ok(ProposalVerdict::Reorganized {
                    depth: reorg.depth,
                    tip,
                })
            }
            Err(e) => {
                self.chain = saved_chain;
                self.accumulator = saved_accumulator;
                self.account = saved_account;
                self.registry = saved_registry;
                self.mempool = saved_mempool;
                Err(e)
            }
        }
    }

    fn replay(&mut self, reorg: &Reorg) -> Result<Vec<ChainEntry>, LedgerError> {
        let removed = self
            .chain
            .rewind_to(&reorg.ancestor)
            .map_err(|reason| IntegrityViolation::ReplayFailed {
                block: reorg.ancestor,
                reason,
            })?;
        let base = self.chain.tip_entry();
        self.accumulator = base.post_state.clone();
        self.account = base.account.clone();
        self.registry.truncate(self.accumulator.len());

        for proposal in &reorg.branch {
            let failed = |e: LedgerError| IntegrityViolation::ReplayFailed {
                block: *proposal.hash(),
                reason: e.to_string(),
            };
            validate_block(proposal, &self.params, Some(self.chain.tip_entry().view()))
                .map_err(|e| failed(e.into()))?;
            self.commit_proposal(proposal).map_err(failed)?;
        }
        Ok(removed)
    }

    /// A fresh node that cannot link a peer's chain to its genesis takes the
    /// proposal's snapshot as its new base.
    fn adopt(&mut self, proposal: &BlockProposal) -> Result<ProposalVerdict, LedgerError> {
        let mut account = self.account.take();
        if matches!(&account, Some(a) if !a.verify(&proposal.snapshot)) {
            log::warn!("⚠️ Own proof does not verify against the adopted base; tracking dropped");
            account = None;
        }
        self.accumulator = proposal.snapshot.clone();
        self.account = account;
        self.registry = AccountRegistry::new();

        let applied = self.apply_block(&proposal.block)?;
        let hash = *proposal.hash();
        self.chain = ChainIndex::new(ChainEntry {
            block: proposal.block.clone(),
            ticket: Some(proposal.ticket.clone()),
            difficulty_factor: proposal.difficulty_factor,
            pre_state: proposal.snapshot.clone(),
            post_state: applied.accumulator.clone(),
            account: applied.account.clone(),
        });
        self.accumulator = applied.accumulator;
        self.account = applied.account;
        self.registry = applied.registry;
        self.mempool = applied.mempool;
        self.mempool.remove_included(&proposal.block);
        self.mempool
            .retain_valid(&self.accumulator, proposal.block.index() + 1);
        self.round_candidate = None;
        self.pending_work = None;

        log::info!(
            "📥 Adopted peer chain at #{} {}",
            proposal.block.index(),
            short_hex(&hash)
        );
        Ok(ProposalVerdict::Adopted(hash))
    }

    // ─────────────────────────────────────────────────────────────
    // TRANSACTIONS & ADMISSIONS
    // ─────────────────────────────────────────────────────────────

    /// Ask `receiver` to build a transfer of `amount` from our account.
    pub fn payment_request(&self, receiver: PublicKey, amount: u64) -> Result<PaymentRequest, Rejection> {
        let sender = self.account.as_ref().ok_or(Rejection::NotRegistered)?;
        if amount == 0 {
            return Err(Rejection::ZeroAmount);
        }
        if amount > sender.money {
            return Err(Rejection::InsufficientFunds {
                amount,
                money: sender.money,
            });
        }
        if receiver == self.public_key {
            return Err(Rejection::SelfTransfer);
        }
        Ok(PaymentRequest {
            amount,
            sender: sender.clone(),
            receiver,
        })
    }

    /// Build, sign (as receiver) and queue the transaction a payer asked for.
    ///
    /// Returns `None` when the request is addressed to someone else.
    pub fn accept_payment_request(
        &mut self,
        request: &PaymentRequest,
    ) -> Result<Option<Transaction>, LedgerError> {
        if request.receiver != self.public_key {
            return Ok(None);
        }
        let receiver = self.account.clone().ok_or(Rejection::NotRegistered)?;
        let expiration = self.chain.height() + self.params.transaction_lifetime;
        let mut tx = Transaction::unsigned(request.amount, expiration, request.sender.clone(), receiver);
        tx.sign(&self.keypair)
            .map_err(|e| LedgerError::Malformed(e.to_string()))?;
        self.submit_transaction(tx.clone())?;
        log::info!(
            "💸 Accepted {} from {}, expires at #{}",
            request.amount,
            request.sender.public_key,
            expiration
        );
        Ok(Some(tx))
    }

    /// Validate against the tip and queue for the next block.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<Hash, Rejection> {
        validate_transaction_at(&tx, &self.accumulator, self.chain.height() + 1)?;
        self.mempool.add_transaction(tx)
    }

    pub fn submit_admission(&mut self, key: PublicKey) -> Result<(), Rejection> {
        if self.registry.contains(&key) {
            return Err(Rejection::DuplicateUser);
        }
        self.mempool.add_admission(key)
    }

    /// Our key, while we still need to ask peers to admit us.
    pub fn admission_request(&self) -> Option<PublicKey> {
        match self.account {
            None => Some(self.public_key),
            Some(_) => None,
        }
    }

    /// Serve a block we hold, as the envelope a peer needs to validate it.
    pub fn block_proposal(&self, hash: &Hash) -> Option<BlockProposal> {
        if let Some(entry) = self.chain.get(hash) {
            return entry.proposal();
        }
        self.round_candidate
            .as_ref()
            .filter(|c| c.hash() == hash)
            .cloned()
    }

    /// Every servable block on the local chain.
    pub fn served_proposals(&self) -> Vec<BlockProposal> {
        self.chain
            .ordered()
            .into_iter()
            .filter_map(|e| e.proposal())
            .collect()
    }

    // ─────────────────────────────────────────────────────────────
    // ACCESSORS
    // ─────────────────────────────────────────────────────────────

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn registration(&self) -> Registration {
        match &self.account {
            Some(a) => Registration::Registered { pos: a.pos },
            None => Registration::Unregistered,
        }
    }

    pub fn height(&self) -> u64 {
        self.chain.height()
    }

    pub fn tip_hash(&self) -> &Hash {
        self.chain.tip()
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    pub fn chain(&self) -> &ChainIndex {
        &self.chain
    }

    pub fn own_balance(&self) -> Option<&BalanceInfo> {
        self.account.as_ref()
    }

    pub fn mempool_stats(&self) -> MempoolStats {
        self.mempool.stats()
    }

    pub fn round_candidate(&self) -> Option<&BlockProposal> {
        self.round_candidate.as_ref()
    }

    pub fn has_pending_work(&self) -> bool {
        self.pending_work.is_some()
    }
}
