// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - CORE MODULE
//
// Ledger primitives: the balance accumulator and the immutable records
// that move through consensus (balance proofs, transactions, blocks,
// lottery tickets, proposals). Balances are whole u64 units.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod accumulator;
pub mod balance;
pub mod block;
pub mod encoding;
pub mod lottery;
pub mod pow;
pub mod proposal;
pub mod transaction;

pub use accumulator::{Accumulator, AccumulatorError};
pub use balance::{balance_data, BalanceInfo};
pub use block::Block;
pub use encoding::{canonical_bytes, decode, EncodingError, PublicKey};
pub use lottery::LotteryTicket;
pub use proposal::BlockProposal;
pub use shp_crypto::Hash;
pub use transaction::Transaction;

/// Blocks a transaction stays includable after it is built.
pub const TRANSACTION_EXPIRATION: u64 = 100;

/// Chain entries kept behind the tip; also the deepest fork we walk.
pub const LOCAL_CHAIN_SIZE: usize = 2 * TRANSACTION_EXPIRATION as usize;

/// Max transactions per block.
#[cfg(debug_assertions)]
pub const TRANSACTIONS_PER_BLOCK: usize = 2;
#[cfg(not(debug_assertions))]
pub const TRANSACTIONS_PER_BLOCK: usize = 1000;

/// Max admissions per block.
#[cfg(debug_assertions)]
pub const NEW_USERS_PER_BLOCK: usize = 2;
#[cfg(not(debug_assertions))]
pub const NEW_USERS_PER_BLOCK: usize = 1000;

/// Seconds per lottery round.
pub const TIME_INTERVAL_SECONDS: u64 = 1;

/// Seconds between admission re-broadcasts while unregistered.
pub const USER_ADD_BROADCAST_PERIOD: u64 = 5;

/// Reward paid to a third-party proof-of-work solver.
pub const POW_PAY: u64 = 1;

/// Default proof-of-work bit target (0 = lottery alone decides).
pub const DEFAULT_POW_BITS: u32 = 0;

/// Money the first node of a fresh network starts with.
pub const BOOTSTRAP_MONEY: u64 = 50;

pub const GENESIS_PREV_HASH: Hash = [0u8; 32];
