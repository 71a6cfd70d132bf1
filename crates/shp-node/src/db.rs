// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - DATABASE MODULE
//
// sled store for the retained chain window and the account registry.
// A save is one cross-tree transaction; a crash mid-save leaves the
// previous state intact.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::error::NodeError;
use shp_consensus::{AccountRegistry, ChainEntry, PersistedState};
use shp_core::encoding::short_hex;
use shp_core::Hash;
use sled::transaction::TransactionError;
use sled::{Db, Transactional, Tree};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// index (big-endian) -> ChainEntry JSON
const TREE_CHAIN: &str = "chain";
/// index (big-endian) -> block hash, to skip rewriting unchanged entries
const TREE_HASHES: &str = "chain_hashes";
const TREE_META: &str = "metadata";

const KEY_REGISTRY: &[u8] = b"registry";
const KEY_TIP: &[u8] = b"tip";

/// Delays between attempts when another process still holds the lock.
const LOCK_RETRY_DELAYS_MS: [u64; 3] = [250, 500, 1000];

pub struct ChainStore {
    db: Db,
}

impl ChainStore {
    /// Open or create, retrying briefly while the file lock is held.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let mut attempt = 0;
        loop {
            match sled::open(path) {
                Ok(db) => return Ok(Self { db }),
                Err(e) if Self::is_lock_error(&e) && attempt < LOCK_RETRY_DELAYS_MS.len() => {
                    log::warn!(
                        "⚠️ Database lock held at {}, retry {}/{}",
                        path.display(),
                        attempt + 1,
                        LOCK_RETRY_DELAYS_MS.len()
                    );
                    std::thread::sleep(Duration::from_millis(LOCK_RETRY_DELAYS_MS[attempt]));
                    attempt += 1;
                }
                Err(e) => {
                    return Err(NodeError::Storage(format!(
                        "cannot open {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
    }

    fn is_lock_error(e: &sled::Error) -> bool {
        let msg = e.to_string();
        msg.contains("Resource temporarily unavailable")
            || msg.contains("WouldBlock")
            || msg.contains("lock")
    }

    fn tree(&self, name: &str) -> Result<Tree, NodeError> {
        Ok(self.db.open_tree(name)?)
    }

    pub fn is_empty(&self) -> Result<bool, NodeError> {
        Ok(self.tree(TREE_CHAIN)?.is_empty())
    }

    /// Replace the stored chain window with `state`.
    pub fn save(&self, state: &PersistedState) -> Result<(), NodeError> {
        let chain = self.tree(TREE_CHAIN)?;
        let hashes = self.tree(TREE_HASHES)?;
        let meta = self.tree(TREE_META)?;

        // Serialize outside the transaction; only changed entries are written.
        let mut stored: BTreeMap<[u8; 8], Vec<u8>> = BTreeMap::new();
        for item in hashes.iter() {
            let (key, value) = item?;
            if let Ok(index) = <[u8; 8]>::try_from(key.as_ref()) {
                stored.insert(index, value.to_vec());
            }
        }
        let mut writes: Vec<([u8; 8], Hash, Vec<u8>)> = Vec::new();
        for entry in &state.entries {
            let index = entry.block.index().to_be_bytes();
            let hash = *entry.hash();
            if stored.remove(&index).as_deref() == Some(&hash[..]) {
                continue;
            }
            writes.push((index, hash, serde_json::to_vec(entry)?));
        }
        // Whatever is left in `stored` fell out of the window.
        let stale: Vec<[u8; 8]> = stored.into_keys().collect();
        let registry = serde_json::to_vec(&state.registry)?;
        let tip = state.entries.last().map(|e| *e.hash());

        (&chain, &hashes, &meta)
            .transaction(|(tx_chain, tx_hashes, tx_meta)| {
                for index in &stale {
                    tx_chain.remove(&index[..])?;
                    tx_hashes.remove(&index[..])?;
                }
                for (index, hash, json) in &writes {
                    tx_chain.insert(&index[..], json.as_slice())?;
                    tx_hashes.insert(&index[..], &hash[..])?;
                }
                tx_meta.insert(KEY_REGISTRY, registry.as_slice())?;
                if let Some(tip) = &tip {
                    tx_meta.insert(KEY_TIP, &tip[..])?;
                }
                Ok(())
            })
            .map_err(|e: TransactionError<()>| NodeError::Storage(format!("atomic save failed: {:?}", e)))?;

        self.db.flush()?;
        log::debug!(
            "💾 Saved chain window: {} written, {} dropped, tip {}",
            writes.len(),
            stale.len(),
            tip.as_ref().map(short_hex).unwrap_or_default()
        );
        Ok(())
    }

    /// `None` when nothing was ever saved.
    pub fn load(&self) -> Result<Option<PersistedState>, NodeError> {
        let chain = self.tree(TREE_CHAIN)?;
        if chain.is_empty() {
            return Ok(None);
        }
        // Big-endian keys iterate oldest first.
        let mut entries = Vec::with_capacity(chain.len());
        for item in chain.iter() {
            let (_, value) = item?;
            let entry: ChainEntry = serde_json::from_slice(&value)?;
            entries.push(entry);
        }

        let meta = self.tree(TREE_META)?;
        let registry: AccountRegistry = match meta.get(KEY_REGISTRY)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => return Err(NodeError::Storage("chain stored without registry".into())),
        };
        if let Some(tip) = meta.get(KEY_TIP)? {
            let last = entries.last().map(|e| &e.hash()[..]);
            if last != Some(tip.as_ref()) {
                return Err(NodeError::Storage("stored tip does not match last entry".into()));
            }
        }
        Ok(Some(PersistedState { entries, registry }))
    }

    pub fn flush(&self) -> Result<(), NodeError> {
        self.db.flush()?;
        Ok(())
    }
}
