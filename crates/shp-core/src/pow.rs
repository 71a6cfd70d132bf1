// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - PROOF-OF-WORK TOP-UP
//
// A lottery winner whose block hash misses the bit target can still get
// the block accepted by grinding pow_nonce. When the work is done by
// another account (pow_key != proposer), the block carries exactly one
// reward transaction paying POW_PAY from proposer to pow_key.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::balance::BalanceInfo;
use crate::block::{work_hash, Block};
use crate::encoding::PublicKey;
use crate::transaction::Transaction;
use crate::POW_PAY;
use shp_crypto::{CryptoError, KeyPair};
use std::sync::atomic::{AtomicBool, Ordering};

/// Count leading zero bits in a byte array.
pub fn count_leading_zero_bits(bytes: &[u8]) -> u32 {
    let mut zero_bits = 0u32;
    for byte in bytes {
        if *byte == 0 {
            zero_bits += 8;
        } else {
            zero_bits += byte.leading_zeros();
            break;
        }
    }
    zero_bits
}

pub fn meets_target(block: &Block, bits: u32) -> bool {
    count_leading_zero_bits(block.hash()) >= bits
}

/// Grind `pow_nonce` for `pow_key`, trying at most `attempts` nonces from `start`.
///
/// Returns the sealed block, or `None` if the budget ran out or `cancel` was set.
pub fn solve(
    block: &Block,
    pow_key: PublicKey,
    bits: u32,
    start: u64,
    attempts: u64,
    cancel: &AtomicBool,
) -> Option<Block> {
    let med = *block.med_hash();
    let mut nonce = start;
    for i in 0..attempts {
        // Check cancellation every 65536 hashes
        if i & 0xFFFF == 0 && cancel.load(Ordering::Relaxed) {
            return None;
        }
        if count_leading_zero_bits(&work_hash(&med, Some(&pow_key), nonce)) >= bits {
            return Some(block.clone().with_work(Some(pow_key), nonce));
        }
        nonce = nonce.wrapping_add(1);
    }
    None
}

/// The reward a third-party solver attaches before grinding.
///
/// The miner is the receiver, so the miner signs.
pub fn reward_transaction(
    proposer: &BalanceInfo,
    miner: &BalanceInfo,
    miner_keys: &KeyPair,
    expiration: u64,
) -> Result<Transaction, CryptoError> {
    let mut tx = Transaction::unsigned(POW_PAY, expiration, proposer.clone(), miner.clone());
    tx.sign(miner_keys)?;
    Ok(tx)
}

/// True when `tx` is the reward shape for this proposer and miner.
pub fn is_reward_for(tx: &Transaction, proposer: &PublicKey, miner: &PublicKey) -> bool {
    tx.amount == POW_PAY && &tx.sender.public_key == proposer && &tx.receiver.public_key == miner
}

#[cfg(test)]
mod tests {
    use super::*;
    use shp_crypto::generate_keypair;

    fn block() -> Block {
        Block::new(1, [0u8; 32], BalanceInfo::new(PublicKey([1u8; 32]), 5, 0, vec![]), vec![], vec![], 10)
    }

    #[test]
    fn test_count_leading_zero_bits() {
        assert_eq!(count_leading_zero_bits(&[0x00, 0x00, 0xFF]), 16);
        assert_eq!(count_leading_zero_bits(&[0x00, 0x01, 0xFF]), 15);
        assert_eq!(count_leading_zero_bits(&[0x0F, 0xFF]), 4);
        assert_eq!(count_leading_zero_bits(&[0xFF]), 0);
        assert_eq!(count_leading_zero_bits(&[0x00, 0x00, 0x00, 0x00]), 32);
    }

    #[test]
    fn test_zero_bits_always_met() {
        assert!(meets_target(&block(), 0));
    }

    #[test]
    fn test_solve_low_target() {
        let cancel = AtomicBool::new(false);
        let solved = solve(&block(), PublicKey([1u8; 32]), 8, 0, 1 << 20, &cancel).unwrap();
        assert!(meets_target(&solved, 8));
        assert_eq!(solved.med_hash(), block().med_hash());
        assert_eq!(solved.pow_key(), Some(&PublicKey([1u8; 32])));
    }

    #[test]
    fn test_solve_respects_cancel_and_budget() {
        let cancel = AtomicBool::new(true);
        assert!(solve(&block(), PublicKey([1u8; 32]), 8, 0, 1 << 20, &cancel).is_none());
        let go = AtomicBool::new(false);
        assert!(solve(&block(), PublicKey([1u8; 32]), 255, 0, 16, &go).is_none());
    }

    #[test]
    fn test_reward_transaction_shape() {
        let miner_keys = generate_keypair();
        let miner_key = PublicKey::from_slice(&miner_keys.public_key).unwrap();
        let proposer = BalanceInfo::new(PublicKey([1u8; 32]), 5, 0, vec![]);
        let miner = BalanceInfo::new(miner_key, 0, 1, vec![]);
        let tx = reward_transaction(&proposer, &miner, &miner_keys, 100).unwrap();
        assert!(tx.signature_valid());
        assert!(is_reward_for(&tx, &PublicKey([1u8; 32]), &miner_key));
        assert!(!is_reward_for(&tx, &miner_key, &miner_key));
    }
}
