// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - CONSENSUS MODULE
//
// Stake-weighted lottery consensus over the balance accumulator.
// - validation: read-only transaction and proposal checks
// - chain / fork: block arena and stake-weighted fork choice
// - mempool / registry: pending work and known accounts
// - node: the NodeState that ties them together
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod chain;
pub mod difficulty;
pub mod error;
pub mod fork;
pub mod mempool;
pub mod node;
pub mod params;
pub mod registry;
pub mod validation;

pub use chain::{ChainEntry, ChainIndex};
pub use difficulty::DifficultyPolicy;
pub use error::{IntegrityViolation, LedgerError, Rejection};
pub use fork::{BlockFetcher, ForkDecision};
pub use mempool::{Mempool, MempoolStats};
pub use node::{
    GenesisAccount, NodeState, PaymentRequest, PersistedState, ProposalVerdict, ProposeOutcome,
    Registration,
};
pub use params::ConsensusParams;
pub use registry::AccountRegistry;
