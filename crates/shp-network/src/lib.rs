// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - NETWORK MODULE
//
// Plain TCP gossip between ledger nodes.
// - JSON line envelopes, one connection per message
// - LAN peer discovery over UDP multicast
// - Majority-vote requests for blocks missing locally
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::net::SocketAddr;

pub mod discovery;
pub mod error;
pub mod message;
pub mod peers;
pub mod transport;

pub use discovery::{DiscoveryConfig, DEFAULT_BEACON_PERIOD, DEFAULT_DISCOVERY_PORT, DEFAULT_MULTICAST_GROUP};
pub use error::TransportError;
pub use message::{Message, Request, MAX_MESSAGE_BYTES};
pub use peers::{Beacon, PeerSet};
pub use transport::{serve, BlockSource, SharedBlocks, Transport, TransportConfig, MIN_REQ_ANS, MIN_REQ_TIME};

/// What the network layer hands to the ledger owner.
#[derive(Debug)]
pub enum NetworkEvent {
    Inbound { message: Message, from: SocketAddr },
    PeerDiscovered(SocketAddr),
}
