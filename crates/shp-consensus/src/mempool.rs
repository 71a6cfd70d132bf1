// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - PENDING QUEUES
//
// Transactions and admission requests waiting for a block.
// - Arrival-ordered queue, duplicate detection by hash
// - Batches never write the same account twice
// - Expired or no-longer-valid transactions are swept after each commit
// - Held proofs are refreshed alongside the accumulator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::error::Rejection;
use crate::validation::validate_transaction_at;
use serde::{Deserialize, Serialize};
use shp_core::{Accumulator, Block, Hash, PublicKey, Transaction};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
pub struct Mempool {
    /// Transactions indexed by hash
    transactions: HashMap<Hash, Transaction>,

    /// Arrival order: sequence -> tx_hash
    queue: BTreeMap<u64, Hash>,
    sequence_of: HashMap<Hash, u64>,
    next_sequence: u64,

    /// Admission requests in arrival order
    admissions: VecDeque<PublicKey>,
    admission_set: HashSet<PublicKey>,

    capacity: usize,
    admission_capacity: usize,

    /// Statistics
    pub total_received: u64,
    pub total_accepted: u64,
    pub total_rejected: u64,
    pub total_expired: u64,
}

impl Mempool {
    pub fn new(capacity: usize, admission_capacity: usize) -> Self {
        Self {
            transactions: HashMap::new(),
            queue: BTreeMap::new(),
            sequence_of: HashMap::new(),
            next_sequence: 0,
            admissions: VecDeque::new(),
            admission_set: HashSet::new(),
            capacity,
            admission_capacity,
            total_received: 0,
            total_accepted: 0,
            total_rejected: 0,
            total_expired: 0,
        }
    }

    /// Queue an already-validated transaction.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<Hash, Rejection> {
        self.total_received += 1;
        let tx_hash = tx.hash();

        if self.transactions.contains_key(&tx_hash) {
            self.total_rejected += 1;
            return Err(Rejection::Duplicate);
        }
        if self.transactions.len() >= self.capacity {
            self.total_rejected += 1;
            return Err(Rejection::MempoolFull);
        }

        let seq = self.next_sequence;
        self.next_sequence += 1;
        self.queue.insert(seq, tx_hash);
        self.sequence_of.insert(tx_hash, seq);
        self.transactions.insert(tx_hash, tx);
        self.total_accepted += 1;
        Ok(tx_hash)
    }

    pub fn remove_transaction(&mut self, tx_hash: &Hash) -> Option<Transaction> {
        let tx = self.transactions.remove(tx_hash)?;
        if let Some(seq) = self.sequence_of.remove(tx_hash) {
            self.queue.remove(&seq);
        }
        Some(tx)
    }

    /// Oldest transactions first, skipping any that would write an account
    /// already written by the batch or listed in `reserved`.
    pub fn select_batch(&self, limit: usize, reserved: &HashSet<u64>) -> Vec<Transaction> {
        let mut touched = reserved.clone();
        let mut batch = Vec::new();
        for tx_hash in self.queue.values() {
            if batch.len() >= limit {
                break;
            }
            let Some(tx) = self.transactions.get(tx_hash) else {
                continue;
            };
            let [a, b] = tx.touches();
            if touched.contains(&a) || touched.contains(&b) {
                continue;
            }
            touched.insert(a);
            touched.insert(b);
            batch.push(tx.clone());
        }
        batch
    }

    pub fn add_admission(&mut self, key: PublicKey) -> Result<(), Rejection> {
        if self.admission_set.contains(&key) {
            return Err(Rejection::DuplicateUser);
        }
        if self.admissions.len() >= self.admission_capacity {
            return Err(Rejection::MempoolFull);
        }
        self.admission_set.insert(key);
        self.admissions.push_back(key);
        Ok(())
    }

    pub fn contains_admission(&self, key: &PublicKey) -> bool {
        self.admission_set.contains(key)
    }

    pub fn select_admissions(&self, limit: usize) -> Vec<PublicKey> {
        self.admissions.iter().take(limit).copied().collect()
    }

    /// Drop everything a committed block consumed.
    pub fn remove_included(&mut self, block: &Block) {
        for tx in block.transactions() {
            self.remove_transaction(&tx.hash());
        }
        let users: HashSet<&PublicKey> = block.new_users().iter().collect();
        if !users.is_empty() {
            self.admissions.retain(|k| !users.contains(k));
            self.admission_set.retain(|k| !users.contains(k));
        }
    }

    /// Sweep transactions that can no longer be included at `height`.
    pub fn retain_valid(&mut self, accumulator: &Accumulator, height: u64) -> usize {
        let stale: Vec<Hash> = self
            .transactions
            .iter()
            .filter(|(_, tx)| validate_transaction_at(tx, accumulator, height).is_err())
            .map(|(h, _)| *h)
            .collect();
        for h in &stale {
            self.remove_transaction(h);
        }
        self.total_expired += stale.len() as u64;
        stale.len()
    }

    /// Proof handles of every held transaction, for witness refresh.
    pub fn witnesses_mut(&mut self) -> impl Iterator<Item = (u64, &mut Vec<Hash>)> {
        self.transactions
            .values_mut()
            .flat_map(|tx| tx.witnesses())
    }

    pub fn has_work(&self) -> bool {
        !self.transactions.is_empty() || !self.admissions.is_empty()
    }

    pub fn stats(&self) -> MempoolStats {
        MempoolStats {
            size: self.transactions.len(),
            admissions: self.admissions.len(),
            total_received: self.total_received,
            total_accepted: self.total_accepted,
            total_rejected: self.total_rejected,
            total_expired: self.total_expired,
        }
    }

    pub fn contains(&self, tx_hash: &Hash) -> bool {
        self.transactions.contains_key(tx_hash)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn clear(&mut self) {
        self.transactions.clear();
        self.queue.clear();
        self.sequence_of.clear();
        self.admissions.clear();
        self.admission_set.clear();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolStats {
    pub size: usize,
    pub admissions: usize,
    pub total_received: u64,
    pub total_accepted: u64,
    pub total_rejected: u64,
    pub total_expired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shp_core::BalanceInfo;

    fn create_test_tx(from: u64, to: u64, amount: u64) -> Transaction {
        Transaction::unsigned(
            amount,
            100,
            BalanceInfo::new(PublicKey([from as u8; 32]), 1000, from, vec![]),
            BalanceInfo::new(PublicKey([to as u8; 32]), 0, to, vec![]),
        )
    }

    #[test]
    fn test_add_transaction() {
        let mut mempool = Mempool::new(10, 10);
        assert!(mempool.add_transaction(create_test_tx(0, 1, 5)).is_ok());
        assert_eq!(mempool.len(), 1);
        assert!(mempool.has_work());
    }

    #[test]
    fn test_duplicate_rejection() {
        let mut mempool = Mempool::new(10, 10);
        let tx = create_test_tx(0, 1, 5);
        mempool.add_transaction(tx.clone()).unwrap();
        assert_eq!(mempool.add_transaction(tx), Err(Rejection::Duplicate));
        assert_eq!(mempool.len(), 1);
        assert_eq!(mempool.stats().total_rejected, 1);
    }

    #[test]
    fn test_capacity() {
        let mut mempool = Mempool::new(1, 10);
        mempool.add_transaction(create_test_tx(0, 1, 5)).unwrap();
        assert_eq!(
            mempool.add_transaction(create_test_tx(2, 3, 5)),
            Err(Rejection::MempoolFull)
        );
    }

    #[test]
    fn test_batch_is_ordered_and_conflict_free() {
        let mut mempool = Mempool::new(10, 10);
        mempool.add_transaction(create_test_tx(0, 1, 1)).unwrap();
        mempool.add_transaction(create_test_tx(1, 2, 1)).unwrap(); // touches 1 again
        mempool.add_transaction(create_test_tx(3, 4, 1)).unwrap();
        mempool.add_transaction(create_test_tx(5, 6, 1)).unwrap();

        let batch = mempool.select_batch(10, &HashSet::new());
        let pairs: Vec<[u64; 2]> = batch.iter().map(|t| t.touches()).collect();
        assert_eq!(pairs, vec![[0, 1], [3, 4], [5, 6]]);

        let limited = mempool.select_batch(1, &HashSet::new());
        assert_eq!(limited.len(), 1);

        let reserved: HashSet<u64> = [3].into_iter().collect();
        let skipping = mempool.select_batch(10, &reserved);
        assert_eq!(skipping.len(), 2);
    }

    #[test]
    fn test_remove_transaction() {
        let mut mempool = Mempool::new(10, 10);
        let hash = mempool.add_transaction(create_test_tx(0, 1, 5)).unwrap();
        assert!(mempool.remove_transaction(&hash).is_some());
        assert!(mempool.is_empty());
        assert!(mempool.select_batch(10, &HashSet::new()).is_empty());
    }

    #[test]
    fn test_admissions_dedup_and_removal() {
        let mut mempool = Mempool::new(10, 10);
        mempool.add_admission(PublicKey([1; 32])).unwrap();
        assert_eq!(mempool.add_admission(PublicKey([1; 32])), Err(Rejection::DuplicateUser));
        mempool.add_admission(PublicKey([2; 32])).unwrap();
        assert_eq!(mempool.select_admissions(1), vec![PublicKey([1; 32])]);

        let block = Block::new(
            1,
            [0u8; 32],
            BalanceInfo::empty(),
            vec![],
            vec![PublicKey([1; 32])],
            1,
        );
        mempool.remove_included(&block);
        assert!(!mempool.contains_admission(&PublicKey([1; 32])));
        assert!(mempool.contains_admission(&PublicKey([2; 32])));
    }

    #[test]
    fn test_admission_capacity() {
        let mut mempool = Mempool::new(10, 2);
        mempool.add_admission(PublicKey([1; 32])).unwrap();
        mempool.add_admission(PublicKey([2; 32])).unwrap();
        assert_eq!(mempool.add_admission(PublicKey([3; 32])), Err(Rejection::MempoolFull));
        assert!(!mempool.contains_admission(&PublicKey([3; 32])));
        // A queued key still reports as a duplicate, not as overflow.
        assert_eq!(mempool.add_admission(PublicKey([1; 32])), Err(Rejection::DuplicateUser));

        let block = Block::new(1, [0u8; 32], BalanceInfo::empty(), vec![], vec![PublicKey([1; 32])], 1);
        mempool.remove_included(&block);
        assert!(mempool.add_admission(PublicKey([3; 32])).is_ok());
        assert_eq!(mempool.stats().admissions, 2);
    }

    #[test]
    fn test_retain_valid_sweeps_unprovable() {
        let mut mempool = Mempool::new(10, 10);
        mempool.add_transaction(create_test_tx(0, 1, 5)).unwrap();
        // Proofs do not verify against an empty accumulator.
        assert_eq!(mempool.retain_valid(&Accumulator::new(), 1), 1);
        assert!(mempool.is_empty());
        assert_eq!(mempool.stats().total_expired, 1);
    }
}
