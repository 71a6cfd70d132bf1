// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - BLOCKS
//
// A batch of transactions and admissions built by a lottery winner.
// - med_hash commits to every content field
// - hash = H(med_hash, pow_key, pow_nonce); the nonce is what PoW grinds
// - Hashes are private: a block is always sealed, decoding re-checks them
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::balance::BalanceInfo;
use crate::encoding::{b64_hash, EncodingError, PublicKey, TAG_BLOCK, TAG_BLOCK_MED};
use crate::transaction::Transaction;
use crate::GENESIS_PREV_HASH;
use serde::{Deserialize, Serialize};
use shp_crypto::{FieldHasher, Hash};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BlockWire", into = "BlockWire")]
pub struct Block {
    index: u64,
    prev_hash: Hash,
    proposer: BalanceInfo,
    transactions: Vec<Transaction>,
    new_users: Vec<PublicKey>,
    timestamp: u64,
    pow_key: Option<PublicKey>,
    pow_nonce: u64,
    med_hash: Hash,
    hash: Hash,
}

#[derive(Serialize, Deserialize)]
struct BlockWire {
    index: u64,
    #[serde(with = "b64_hash")]
    prev_hash: Hash,
    proposer_balance_info: BalanceInfo,
    transactions: Vec<Transaction>,
    new_users: Vec<PublicKey>,
    timestamp: u64,
    pow_key: Option<PublicKey>,
    #[serde(default)]
    pow_nonce: u64,
    #[serde(with = "b64_hash")]
    med_hash: Hash,
    #[serde(with = "b64_hash")]
    hash: Hash,
}

impl TryFrom<BlockWire> for Block {
    type Error = EncodingError;

    fn try_from(wire: BlockWire) -> Result<Self, Self::Error> {
        let block = Block::new(
            wire.index,
            wire.prev_hash,
            wire.proposer_balance_info,
            wire.transactions,
            wire.new_users,
            wire.timestamp,
        )
        .with_work(wire.pow_key, wire.pow_nonce);
        if block.med_hash != wire.med_hash {
            return Err(EncodingError::HashMismatch("med_hash"));
        }
        if block.hash != wire.hash {
            return Err(EncodingError::HashMismatch("hash"));
        }
        Ok(block)
    }
}

impl From<Block> for BlockWire {
    fn from(block: Block) -> Self {
        BlockWire {
            index: block.index,
            prev_hash: block.prev_hash,
            proposer_balance_info: block.proposer,
            transactions: block.transactions,
            new_users: block.new_users,
            timestamp: block.timestamp,
            pow_key: block.pow_key,
            pow_nonce: block.pow_nonce,
            med_hash: block.med_hash,
            hash: block.hash,
        }
    }
}

/// Outer hash over the content digest and the work fields.
pub fn work_hash(med_hash: &Hash, pow_key: Option<&PublicKey>, pow_nonce: u64) -> Hash {
    let key: &[u8] = pow_key.map(|k| k.as_bytes()).unwrap_or(&[]);
    FieldHasher::new(TAG_BLOCK)
        .field(med_hash)
        .field(key)
        .u64(pow_nonce)
        .finish()
}

impl Block {
    /// Build and seal a block without proof-of-work fields.
    pub fn new(
        index: u64,
        prev_hash: Hash,
        proposer: BalanceInfo,
        transactions: Vec<Transaction>,
        new_users: Vec<PublicKey>,
        timestamp: u64,
    ) -> Self {
        let mut block = Block {
            index,
            prev_hash,
            proposer,
            transactions,
            new_users,
            timestamp,
            pow_key: None,
            pow_nonce: 0,
            med_hash: [0u8; 32],
            hash: [0u8; 32],
        };
        block.med_hash = block.compute_med_hash();
        block.hash = work_hash(&block.med_hash, None, 0);
        block
    }

    /// Index 0, zero parent, empty proposer. Identical on every node.
    pub fn genesis() -> Self {
        Block::new(0, GENESIS_PREV_HASH, BalanceInfo::empty(), Vec::new(), Vec::new(), 0)
    }

    /// Reseal with new work fields; content and med_hash stay.
    pub fn with_work(mut self, pow_key: Option<PublicKey>, pow_nonce: u64) -> Self {
        self.pow_key = pow_key;
        self.pow_nonce = pow_nonce;
        self.hash = work_hash(&self.med_hash, self.pow_key.as_ref(), pow_nonce);
        self
    }

    /// Append a transaction (the work reward) and reseal everything.
    pub fn with_transaction(mut self, tx: Transaction) -> Self {
        self.transactions.push(tx);
        self.med_hash = self.compute_med_hash();
        self.hash = work_hash(&self.med_hash, self.pow_key.as_ref(), self.pow_nonce);
        self
    }

    fn compute_med_hash(&self) -> Hash {
        let mut hasher = FieldHasher::new(TAG_BLOCK_MED)
            .u64(self.index)
            .field(&self.prev_hash);
        hasher = self.proposer.commit(hasher).u64(self.timestamp);
        hasher = hasher.u64(self.transactions.len() as u64);
        for tx in &self.transactions {
            hasher = hasher.field(&tx.hash());
        }
        hasher = hasher.u64(self.new_users.len() as u64);
        for user in &self.new_users {
            hasher = hasher.field(user.as_bytes());
        }
        hasher.finish()
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn prev_hash(&self) -> &Hash {
        &self.prev_hash
    }

    pub fn proposer(&self) -> &BalanceInfo {
        &self.proposer
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn new_users(&self) -> &[PublicKey] {
        &self.new_users
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn pow_key(&self) -> Option<&PublicKey> {
        self.pow_key.as_ref()
    }

    pub fn pow_nonce(&self) -> u64 {
        self.pow_nonce
    }

    pub fn med_hash(&self) -> &Hash {
        &self.med_hash
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Fork-choice weight: the proposer's stake.
    pub fn stake(&self) -> u64 {
        self.proposer.money
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev_hash == GENESIS_PREV_HASH
    }
}
