// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - PEER SET
//
// Known peers, deduplicated by (ip, port). Shared between the discovery
// listener, which only adds, and the transport, which only reads.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Discovery datagram: where to reach a node, and who it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beacon {
    pub ip: String,
    pub port: u16,
    pub uid: String,
}

impl Beacon {
    pub fn addr(&self) -> Option<SocketAddr> {
        self.ip
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PeerSet {
    inner: Arc<RwLock<BTreeSet<SocketAddr>>>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peers<I: IntoIterator<Item = SocketAddr>>(peers: I) -> Self {
        let set = Self::new();
        for peer in peers {
            set.insert(peer);
        }
        set
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeSet<SocketAddr>> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("⚠️ Peer set lock was poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeSet<SocketAddr>> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("⚠️ Peer set lock was poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }

    /// True if the peer was new.
    pub fn insert(&self, peer: SocketAddr) -> bool {
        self.write().insert(peer)
    }

    pub fn remove(&self, peer: &SocketAddr) -> bool {
        self.write().remove(peer)
    }

    pub fn contains(&self, peer: &SocketAddr) -> bool {
        self.read().contains(peer)
    }

    pub fn snapshot(&self) -> Vec<SocketAddr> {
        self.read().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
