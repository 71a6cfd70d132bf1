// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - BALANCE PROOFS
//
// A claimed account state: (public key, money) at a position, together
// with the sibling path ("brolist") that ties it to an accumulator root.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::accumulator::Accumulator;
use crate::encoding::{b64_hashes, PublicKey, TAG_BALANCE};
use serde::{Deserialize, Serialize};
use shp_crypto::{FieldHasher, Hash};

/// Leaf payload: commits to the key and the amount it holds.
pub fn balance_data(public_key: &PublicKey, money: u64) -> Hash {
    FieldHasher::new(TAG_BALANCE)
        .field(public_key.as_bytes())
        .u64(money)
        .finish()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub public_key: PublicKey,
    pub money: u64,
    pub pos: u64,
    #[serde(with = "b64_hashes")]
    pub brolist: Vec<Hash>,
}

impl BalanceInfo {
    pub fn new(public_key: PublicKey, money: u64, pos: u64, brolist: Vec<Hash>) -> Self {
        Self {
            public_key,
            money,
            pos,
            brolist,
        }
    }

    /// The empty proposer of the genesis block.
    pub fn empty() -> Self {
        Self::new(PublicKey::default(), 0, 0, Vec::new())
    }

    pub fn data(&self) -> Hash {
        balance_data(&self.public_key, self.money)
    }

    pub fn verify(&self, accumulator: &Accumulator) -> bool {
        accumulator.verify(&self.data(), self.pos, &self.brolist)
    }

    /// Path handle for witness refresh.
    pub fn witness(&mut self) -> (u64, &mut Vec<Hash>) {
        (self.pos, &mut self.brolist)
    }

    /// Commitment used inside block hashes; the path is included because
    /// a proposer proof is only meaningful against one snapshot.
    pub fn commit(&self, hasher: FieldHasher) -> FieldHasher {
        let mut hasher = hasher
            .field(self.public_key.as_bytes())
            .u64(self.money)
            .u64(self.pos)
            .u64(self.brolist.len() as u64);
        for sibling in &self.brolist {
            hasher = hasher.field(sibling);
        }
        hasher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_verifies_after_insert() {
        let key = PublicKey([3u8; 32]);
        let mut acc = Accumulator::new();
        acc.insert(&balance_data(&PublicKey([1u8; 32]), 5)).unwrap();
        let (pos, proof) = acc.insert(&balance_data(&key, 50)).unwrap();
        let info = BalanceInfo::new(key, 50, pos, proof);
        assert!(info.verify(&acc));

        let mut richer = info.clone();
        richer.money = 51;
        assert!(!richer.verify(&acc));
    }

    #[test]
    fn test_data_depends_on_key_and_money() {
        let a = balance_data(&PublicKey([1u8; 32]), 10);
        assert_ne!(a, balance_data(&PublicKey([2u8; 32]), 10));
        assert_ne!(a, balance_data(&PublicKey([1u8; 32]), 11));
    }

    #[test]
    fn test_wire_form_is_base64() {
        let info = BalanceInfo::new(PublicKey([0u8; 32]), 7, 2, vec![[0xFFu8; 32]]);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["money"], 7);
        assert!(json["brolist"][0].as_str().unwrap().starts_with("//"));
        let back: BalanceInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }
}
