// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - CONSENSUS PARAMETERS
//
// Every knob the state machine reads. Defaults come from the shp-core
// constants; a node's config file may override any of them.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::difficulty::DifficultyPolicy;
use serde::{Deserialize, Serialize};
use shp_core::{
    DEFAULT_POW_BITS, LOCAL_CHAIN_SIZE, NEW_USERS_PER_BLOCK, TIME_INTERVAL_SECONDS,
    TRANSACTIONS_PER_BLOCK, TRANSACTION_EXPIRATION,
};

/// Maximum pending transactions held locally
pub const MAX_MEMPOOL_SIZE: usize = 10_000;

/// Maximum pending admission requests held locally
pub const MAX_PENDING_ADMISSIONS: usize = 10_000;

/// Seconds a peer's block timestamp may run ahead of the local clock
pub const MAX_CLOCK_DRIFT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    pub transactions_per_block: usize,
    pub new_users_per_block: usize,
    /// Leading zero bits a block hash needs.
    pub pow_bits: u32,
    pub difficulty: DifficultyPolicy,
    /// Tickets drawn per proposal attempt (one per second).
    pub lottery_window_secs: u64,
    /// Chain entries kept behind the tip, and the deepest fork walk.
    pub max_fork_depth: usize,
    /// Blocks a new transaction stays includable.
    pub transaction_lifetime: u64,
    pub mempool_capacity: usize,
    pub admission_capacity: usize,
    /// Accepted lead of a received block's timestamp over local time.
    pub max_clock_drift_secs: u64,
    /// Propose even when no transactions or admissions are pending.
    pub propose_empty_blocks: bool,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            transactions_per_block: TRANSACTIONS_PER_BLOCK,
            new_users_per_block: NEW_USERS_PER_BLOCK,
            pow_bits: DEFAULT_POW_BITS,
            difficulty: DifficultyPolicy::default(),
            lottery_window_secs: TIME_INTERVAL_SECONDS,
            max_fork_depth: LOCAL_CHAIN_SIZE,
            transaction_lifetime: TRANSACTION_EXPIRATION,
            mempool_capacity: MAX_MEMPOOL_SIZE,
            admission_capacity: MAX_PENDING_ADMISSIONS,
            max_clock_drift_secs: MAX_CLOCK_DRIFT_SECS,
            propose_empty_blocks: false,
        }
    }
}

impl ConsensusParams {
    pub fn difficulty_factor(&self) -> u128 {
        self.difficulty.factor()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.transactions_per_block == 0 {
            return Err("transactions_per_block must be > 0".to_string());
        }
        if self.new_users_per_block == 0 {
            return Err("new_users_per_block must be > 0".to_string());
        }
        if self.lottery_window_secs == 0 {
            return Err("lottery_window_secs must be > 0".to_string());
        }
        if self.max_fork_depth == 0 {
            return Err("max_fork_depth must be > 0".to_string());
        }
        if self.admission_capacity < self.new_users_per_block {
            return Err("admission_capacity must hold at least one block of admissions".to_string());
        }
        if self.pow_bits > 256 {
            return Err(format!("pow_bits {} exceeds hash width", self.pow_bits));
        }
        Ok(())
    }
}
