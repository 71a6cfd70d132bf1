// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - LEDGER ERRORS
//
// Closed set of failure kinds. None of them is fatal to the node:
// - Malformed:       undecodable input, dropped at the boundary
// - Invalid:         a well-formed object that fails a rule
// - Integrity:       equivocation or an accumulator slot mismatch
// - MissingAncestor: a fork walk could not fetch a parent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use shp_core::{AccumulatorError, EncodingError, Hash};
use thiserror::Error;

fn short(hash: &Hash) -> String {
    shp_core::encoding::short_hex(hash)
}

/// A rule an object broke.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("{0} balance proof does not verify")]
    BadProof(&'static str),
    #[error("bad receiver signature")]
    BadSignature,
    #[error("amount must be positive")]
    ZeroAmount,
    #[error("receiver balance would overflow")]
    BalanceOverflow,
    #[error("amount {amount} exceeds sender money {money}")]
    InsufficientFunds { amount: u64, money: u64 },
    #[error("sender and receiver are the same account")]
    SelfTransfer,
    #[error("transaction expired at {expiration}, height is {height}")]
    Expired { expiration: u64, height: u64 },
    #[error("block index {got}, expected {expected}")]
    BadHeight { expected: u64, got: u64 },
    #[error("block timestamp {got} not after parent timestamp {parent}")]
    StaleTimestamp { parent: u64, got: u64 },
    #[error("block timestamp {got} is past the local clock limit {limit}")]
    FutureTimestamp { limit: u64, got: u64 },
    #[error("ticket does not match block timestamp or proposer")]
    TicketMismatch,
    #[error("lottery ticket above stake threshold")]
    LotteryLost,
    #[error("difficulty factor {got} differs from local {expected}")]
    DifficultyMismatch { expected: u128, got: u128 },
    #[error("block hash has fewer than {bits} leading zero bits")]
    InsufficientWork { bits: u32 },
    #[error("proof-of-work reward transaction missing or malformed")]
    RewardRule,
    #[error("proposal snapshot differs from the parent state")]
    SnapshotMismatch,
    #[error("account {0} written by more than one transaction")]
    ConflictingTransactions(u64),
    #[error("batch of {got} exceeds limit {limit}")]
    BatchTooLarge { limit: usize, got: usize },
    #[error("public key already registered or pending")]
    DuplicateUser,
    #[error("genesis cannot be proposed")]
    GenesisProposal,
    #[error("block does not extend the current tip")]
    DetachedBlock,
    #[error("node is not registered")]
    NotRegistered,
    #[error("payment is addressed to another node")]
    NotForUs,
    #[error("unknown receiver")]
    UnknownReceiver,
    #[error("mempool full")]
    MempoolFull,
    #[error("already known")]
    Duplicate,
}

/// Things that should never happen between honest nodes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    #[error("equivocation: block {} seen with two transaction sets", short(.0))]
    Equivocation(Hash),
    #[error("accumulator: {0}")]
    Accumulator(#[from] AccumulatorError),
    #[error("replay of branch failed at block {}: {reason}", short(.block))]
    ReplayFailed { block: Hash, reason: String },
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("malformed input: {0}")]
    Malformed(String),
    #[error("invalid: {0}")]
    Invalid(#[from] Rejection),
    #[error("integrity violation: {0}")]
    Integrity(#[from] IntegrityViolation),
    #[error("missing ancestor {}", short(.0))]
    MissingAncestor(Hash),
}

impl From<EncodingError> for LedgerError {
    fn from(e: EncodingError) -> Self {
        LedgerError::Malformed(e.to_string())
    }
}

impl From<AccumulatorError> for LedgerError {
    fn from(e: AccumulatorError) -> Self {
        LedgerError::Integrity(IntegrityViolation::Accumulator(e))
    }
}

impl LedgerError {
    /// Log at the level its kind deserves.
    pub fn log(&self, context: &str) {
        match self {
            LedgerError::Malformed(_) => log::warn!("⚠️ {}: {}", context, self),
            LedgerError::Invalid(_) => log::info!("🗑️ {}: fork or stale ({})", context, self),
            LedgerError::Integrity(_) => log::error!("🚨 {}: {}", context, self),
            LedgerError::MissingAncestor(_) => log::debug!("🔍 {}: {}", context, self),
        }
    }
}
