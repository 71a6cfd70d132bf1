// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - LAN DISCOVERY
//
// UDP multicast beacons announcing { ip, port, uid }.
// - Every node periodically sends its own beacon to the group
// - Listeners add unseen (ip, port) pairs to the peer set
// - A node ignores beacons carrying its own uid
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::peers::{Beacon, PeerSet};
use crate::NetworkEvent;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

pub const DEFAULT_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 77, 77);
pub const DEFAULT_DISCOVERY_PORT: u16 = 47_777;
pub const DEFAULT_BEACON_PERIOD: Duration = Duration::from_secs(5);

const MAX_BEACON_BYTES: usize = 1024;

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub group: Ipv4Addr,
    pub port: u16,
    pub period: Duration,
    /// What this node announces.
    pub beacon: Beacon,
}

impl DiscoveryConfig {
    pub fn group_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.group, self.port))
    }
}

/// Bound, group-joined, non-blocking socket shared by several local nodes.
pub fn multicast_socket(group: Ipv4Addr, port: u16) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&SockAddr::from(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port)))?;
    socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
    socket.set_multicast_loop_v4(true)?;
    socket.set_multicast_ttl_v4(1)?;
    UdpSocket::from_std(socket.into())
}

/// Decode a datagram and record the peer it names.
/// Returns the address only when it was not known before.
pub fn handle_beacon(bytes: &[u8], own_uid: &str, peers: &PeerSet) -> Option<SocketAddr> {
    let beacon: Beacon = match serde_json::from_slice(bytes) {
        Ok(b) => b,
        Err(e) => {
            log::debug!("Ignoring malformed beacon: {}", e);
            return None;
        }
    };
    if beacon.uid == own_uid {
        return None;
    }
    let addr = beacon.addr()?;
    peers.insert(addr).then_some(addr)
}

pub async fn run_beacon(config: DiscoveryConfig) -> io::Result<()> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.set_multicast_ttl_v4(1)?;
    let payload = serde_json::to_vec(&config.beacon).map_err(io::Error::other)?;
    let target = config.group_addr();
    let mut ticker = tokio::time::interval(config.period);
    loop {
        ticker.tick().await;
        if let Err(e) = socket.send_to(&payload, target).await {
            log::warn!("⚠️ Beacon send failed: {}", e);
        }
    }
}

pub async fn run_listener(
    config: DiscoveryConfig,
    peers: PeerSet,
    events: mpsc::Sender<NetworkEvent>,
) -> io::Result<()> {
    let socket = multicast_socket(config.group, config.port)?;
    let mut buf = vec![0u8; MAX_BEACON_BYTES];
    loop {
        let (len, _) = socket.recv_from(&mut buf).await?;
        if let Some(addr) = handle_beacon(&buf[..len], &config.beacon.uid, &peers) {
            log::info!("📡 Discovered peer {} ({} known)", addr, peers.len());
            if events.send(NetworkEvent::PeerDiscovered(addr)).await.is_err() {
                return Ok(());
            }
        }
    }
}
