//! Position → public key directory of registered accounts.
//!
//! Filled from genesis and from every applied block's `new_users`. A node
//! that adopted a peer's snapshot mid-chain only knows the keys it has seen
//! registered since, so lookups are partial by nature.

use serde::{Deserialize, Serialize};
use shp_core::PublicKey;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRegistry {
    by_pos: BTreeMap<u64, PublicKey>,
    #[serde(skip)]
    by_key: HashMap<PublicKey, u64>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pos: u64, key: PublicKey) {
        self.by_pos.insert(pos, key);
        self.by_key.insert(key, pos);
    }

    pub fn position_of(&self, key: &PublicKey) -> Option<u64> {
        self.by_key.get(key).copied()
    }

    pub fn key_at(&self, pos: u64) -> Option<&PublicKey> {
        self.by_pos.get(&pos)
    }

    pub fn contains(&self, key: &PublicKey) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.by_pos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pos.is_empty()
    }

    /// Forget every position >= `n` (rollback to an accumulator of size n).
    pub fn truncate(&mut self, n: u64) {
        let dropped = self.by_pos.split_off(&n);
        for key in dropped.values() {
            self.by_key.remove(key);
        }
    }

    /// Rebuild the reverse index after deserializing.
    pub fn reindex(&mut self) {
        self.by_key = self.by_pos.iter().map(|(p, k)| (*k, *p)).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_truncate() {
        let mut reg = AccountRegistry::new();
        for i in 0..5u8 {
            reg.register(i as u64, PublicKey([i; 32]));
        }
        assert_eq!(reg.position_of(&PublicKey([3; 32])), Some(3));
        reg.truncate(3);
        assert_eq!(reg.len(), 3);
        assert!(!reg.contains(&PublicKey([3; 32])));
        assert!(reg.contains(&PublicKey([2; 32])));
    }

    #[test]
    fn test_reindex_after_serde() {
        let mut reg = AccountRegistry::new();
        reg.register(0, PublicKey([1; 32]));
        let json = serde_json::to_string(&reg).unwrap();
        let mut back: AccountRegistry = serde_json::from_str(&json).unwrap();
        assert!(!back.contains(&PublicKey([1; 32])));
        back.reindex();
        assert_eq!(back.position_of(&PublicKey([1; 32])), Some(0));
    }
}
