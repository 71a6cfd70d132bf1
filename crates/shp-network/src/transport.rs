// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - TCP TRANSPORT
//
// One connection per message, one JSON line per connection.
// - Broadcast: fire to every known peer in parallel
// - Request: the reply comes back on the same connection
// - request_most_likely: fan out, count accepted replies until a quorum or a
//   timeout, return the plurality answer by canonical bytes
// - Server: answers block requests, forwards everything else as events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::error::TransportError;
use crate::message::{Message, Request, MAX_MESSAGE_BYTES};
use crate::peers::PeerSet;
use crate::NetworkEvent;
use futures::future::join_all;
use shp_consensus::PaymentRequest;
use shp_core::encoding::short_hex;
use shp_core::{canonical_bytes, BlockProposal, Hash, PublicKey, Transaction};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};

/// Answers needed before `request_most_likely` stops waiting.
pub const MIN_REQ_ANS: usize = 10;
/// Longest `request_most_likely` waits for that many answers.
pub const MIN_REQ_TIME: Duration = Duration::from_secs(3);

/// Inbound connections that stay silent this long are dropped.
const INBOUND_READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub gather_timeout: Duration,
    pub quorum: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
            gather_timeout: MIN_REQ_TIME,
            quorum: MIN_REQ_ANS,
        }
    }
}

/// Read one newline-terminated message. `Ok(None)` on a clean close.
async fn read_message<R: AsyncBufRead + Unpin>(reader: R) -> Result<Option<Message>, TransportError> {
    let mut limited = reader.take(MAX_MESSAGE_BYTES as u64 + 1);
    let mut line = Vec::new();
    let n = limited.read_until(b'\n', &mut line).await?;
    if n == 0 {
        return Ok(None);
    }
    if n > MAX_MESSAGE_BYTES {
        return Err(TransportError::TooLarge);
    }
    Ok(Some(Message::from_line(&line)?))
}

#[derive(Debug, Clone)]
pub struct Transport {
    peers: PeerSet,
    config: TransportConfig,
}

impl Transport {
    pub fn new(peers: PeerSet, config: TransportConfig) -> Self {
        Self { peers, config }
    }

    pub fn peers(&self) -> &PeerSet {
        &self.peers
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn connect(&self, peer: SocketAddr) -> Result<TcpStream, TransportError> {
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(peer)).await??;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    /// Deliver one message without waiting for an answer.
    pub async fn send(&self, peer: SocketAddr, message: &Message) -> Result<(), TransportError> {
        let line = message.to_line()?;
        let mut stream = self.connect(peer).await?;
        timeout(self.config.request_timeout, async {
            stream.write_all(&line).await?;
            stream.shutdown().await
        })
        .await??;
        Ok(())
    }

    /// Send and read the reply off the same connection.
    pub async fn request(&self, peer: SocketAddr, message: &Message) -> Result<Message, TransportError> {
        let line = message.to_line()?;
        let mut stream = self.connect(peer).await?;
        timeout(self.config.request_timeout, async {
            stream.write_all(&line).await?;
            read_message(BufReader::new(&mut stream))
                .await?
                .ok_or(TransportError::NoReply)
        })
        .await?
    }

    /// Send to every known peer; returns how many accepted the message.
    pub async fn broadcast(&self, message: &Message) -> usize {
        let peers = self.peers.snapshot();
        let sends = peers.iter().map(|peer| self.send(*peer, message));
        let results = join_all(sends).await;
        let mut delivered = 0;
        for (peer, result) in peers.iter().zip(results) {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => log::debug!("Broadcast of {} to {} failed: {}", message.kind(), peer, e),
            }
        }
        delivered
    }

    /// Ask every peer, keep the replies `accept` lets through, and return the
    /// one most of them agree on. Replies still in flight once a quorum or the
    /// gather timeout is reached are left to finish on their own.
    pub async fn request_most_likely<F>(&self, message: &Message, accept: F) -> Option<Message>
    where
        F: Fn(&Message) -> bool,
    {
        let peers = self.peers.snapshot();
        if peers.is_empty() {
            return None;
        }
        let quorum = self.config.quorum.clamp(1, peers.len());
        let (tx, mut rx) = mpsc::channel(peers.len());
        for peer in peers {
            let transport = self.clone();
            let message = message.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                match transport.request(peer, &message).await {
                    Ok(reply) => {
                        let _ = tx.send(reply).await;
                    }
                    Err(e) => log::debug!("Request to {} failed: {}", peer, e),
                }
            });
        }
        drop(tx);

        let deadline = Instant::now() + self.config.gather_timeout;
        let mut votes: BTreeMap<Vec<u8>, (usize, Message)> = BTreeMap::new();
        let mut answered = 0;
        while answered < quorum {
            let reply = match timeout_at(deadline, rx.recv()).await {
                Ok(Some(reply)) => reply,
                Ok(None) | Err(_) => break,
            };
            if !accept(&reply) {
                continue;
            }
            let Ok(key) = canonical_bytes(&reply) else {
                continue;
            };
            votes.entry(key).or_insert((0, reply)).0 += 1;
            answered += 1;
        }

        let mut best: Option<(usize, Message)> = None;
        for (count, reply) in votes.into_values() {
            if best.as_ref().map_or(true, |(c, _)| count > *c) {
                best = Some((count, reply));
            }
        }
        best.map(|(_, reply)| reply)
    }

    /// Ask the network for a block by hash; only an envelope whose block hashes
    /// to `hash` counts as an answer.
    pub async fn fetch_block(&self, hash: &Hash) -> Option<BlockProposal> {
        let wanted = *hash;
        let request = Message::Request(Request::GetBlock { hash: wanted });
        let reply = self
            .request_most_likely(&request, move |reply| {
                matches!(reply, Message::Response(Some(p)) if p.hash() == &wanted)
            })
            .await;
        match reply {
            Some(Message::Response(Some(proposal))) => Some(proposal),
            _ => {
                log::debug!("🔍 No peer could supply block {}", short_hex(&wanted));
                None
            }
        }
    }

    pub async fn broadcast_block_proposal(&self, proposal: BlockProposal) -> usize {
        self.broadcast(&Message::CreateBlock(proposal)).await
    }

    pub async fn broadcast_admission_request(&self, key: PublicKey) -> usize {
        self.broadcast(&Message::AddUser(key)).await
    }

    pub async fn broadcast_transaction_request(&self, request: PaymentRequest) -> usize {
        self.broadcast(&Message::ReqGetMoney(request)).await
    }

    pub async fn broadcast_transaction_verified(&self, tx: Transaction) -> usize {
        self.broadcast(&Message::TransactionVerified(tx)).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SERVER
// ─────────────────────────────────────────────────────────────────────────────

/// Where the server looks up blocks peers ask for.
pub trait BlockSource: Send + Sync {
    fn block_proposal(&self, hash: &Hash) -> Option<BlockProposal>;
}

/// Block lookup table the ledger owner refreshes after each commit.
#[derive(Debug, Default)]
pub struct SharedBlocks {
    inner: RwLock<HashMap<Hash, BlockProposal>>,
}

impl SharedBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all<I: IntoIterator<Item = BlockProposal>>(&self, proposals: I) {
        let fresh: HashMap<Hash, BlockProposal> =
            proposals.into_iter().map(|p| (*p.hash(), p)).collect();
        match self.inner.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => {
                log::warn!("⚠️ Block table lock was poisoned, recovering...");
                *poisoned.into_inner() = fresh;
            }
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlockSource for SharedBlocks {
    fn block_proposal(&self, hash: &Hash) -> Option<BlockProposal> {
        match self.inner.read() {
            Ok(guard) => guard.get(hash).cloned(),
            Err(poisoned) => poisoned.into_inner().get(hash).cloned(),
        }
    }
}

/// Accept connections until the listener fails or the event receiver is gone.
pub async fn serve(
    listener: TcpListener,
    events: mpsc::Sender<NetworkEvent>,
    blocks: Arc<dyn BlockSource>,
) -> std::io::Result<()> {
    loop {
        let (stream, from) = listener.accept().await?;
        if events.is_closed() {
            return Ok(());
        }
        let events = events.clone();
        let blocks = Arc::clone(&blocks);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, from, events, blocks).await {
                log::warn!("⚠️ Dropped message from {}: {}", from, e);
            }
        });
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    from: SocketAddr,
    events: mpsc::Sender<NetworkEvent>,
    blocks: Arc<dyn BlockSource>,
) -> Result<(), TransportError> {
    let message = timeout(INBOUND_READ_TIMEOUT, read_message(BufReader::new(&mut stream))).await??;
    let Some(message) = message else {
        return Ok(());
    };
    match message {
        Message::Request(Request::GetBlock { hash }) => {
            let reply = Message::Response(blocks.block_proposal(&hash));
            stream.write_all(&reply.to_line()?).await?;
            stream.shutdown().await?;
        }
        other => {
            log::debug!("Inbound {} from {}", other.kind(), from);
            // A closed receiver means the node is shutting down.
            let _ = events.send(NetworkEvent::Inbound { message: other, from }).await;
        }
    }
    Ok(())
}
