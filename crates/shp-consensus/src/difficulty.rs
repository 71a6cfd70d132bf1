// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - DIFFICULTY POLICY
//
// The lottery factor every node must agree on. A proposal played under a
// different factor is rejected outright.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};

/// How the lottery factor is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DifficultyPolicy {
    /// Use this factor as is.
    Fixed {
        #[serde(with = "shp_core::encoding::u128_string")]
        factor: u128,
    },
    /// About one winner per `window` tickets when the declared total stake
    /// is accurate: factor = u128::MAX / (total_stake × window).
    TargetStake { total_stake: u64, window: u64 },
}

impl Default for DifficultyPolicy {
    fn default() -> Self {
        DifficultyPolicy::TargetStake {
            total_stake: 100,
            window: 1,
        }
    }
}

impl DifficultyPolicy {
    pub fn factor(&self) -> u128 {
        match *self {
            DifficultyPolicy::Fixed { factor } => factor,
            DifficultyPolicy::TargetStake {
                total_stake,
                window,
            } => {
                let denom = (total_stake.max(1) as u128).saturating_mul(window.max(1) as u128);
                u128::MAX / denom
            }
        }
    }
}
