// ========================================
// NETWORK ROUND-TRIP TESTS FOR STAKEHEAP (SHP)
// ========================================
//
// Real TCP on 127.0.0.1 with ephemeral ports.
//
// Test Scenarios:
// 1. fetch_block from a serving node, known and unknown hashes
// 2. Gossip is forwarded to the receiving node's event channel
// 3. request_most_likely returns the plurality answer
// 4. fetch_block refuses an answer for a different hash
//
// Usage:
//   cargo test --test network_roundtrip -- --nocapture
//
// ========================================

use shp_consensus::{ConsensusParams, DifficultyPolicy, GenesisAccount, NodeState, ProposeOutcome};
use shp_core::{BlockProposal, Hash, PublicKey};
use shp_crypto::generate_keypair_from_seed;
use shp_network::{
    serve, BlockSource, Message, NetworkEvent, PeerSet, Request, SharedBlocks, Transport, TransportConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A peer that answers every block request with the same envelope.
struct FixedAnswer(Option<BlockProposal>);

impl BlockSource for FixedAnswer {
    fn block_proposal(&self, _: &Hash) -> Option<BlockProposal> {
        self.0.clone()
    }
}

/// A real proposal from a one-account network; `seed` picks the proposer.
fn sample_proposal(seed: u8) -> BlockProposal {
    let kp = generate_keypair_from_seed(&[seed; 32]).unwrap();
    let key = PublicKey::from_slice(&kp.public_key).unwrap();
    let params = ConsensusParams {
        difficulty: DifficultyPolicy::Fixed { factor: u128::MAX },
        propose_empty_blocks: true,
        ..Default::default()
    };
    let mut node = NodeState::new(params, kp, &[GenesisAccount { public_key: key, money: 50 }]).unwrap();
    match node.propose(10).unwrap() {
        ProposeOutcome::Proposed(p) => p,
        other => panic!("expected a proposal, got {:?}", other),
    }
}

async fn start_node(blocks: Arc<dyn BlockSource>) -> (SocketAddr, mpsc::Receiver<NetworkEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let _ = serve(listener, tx, blocks).await;
    });
    (addr, rx)
}

fn transport_to(peers: &[SocketAddr], quorum: usize) -> Transport {
    let config = TransportConfig {
        connect_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_secs(2),
        gather_timeout: Duration::from_secs(2),
        quorum,
    };
    Transport::new(PeerSet::with_peers(peers.iter().copied()), config)
}

// ========================================
// TEST 1: FETCH FROM A SERVING NODE
// ========================================
#[tokio::test]
async fn test_fetch_block_from_peer() {
    println!("\n🧪 TEST 1: fetch_block");
    let proposal = sample_proposal(1);
    let blocks = Arc::new(SharedBlocks::new());
    blocks.replace_all([proposal.clone()]);
    let (addr, _events) = start_node(blocks).await;

    let transport = transport_to(&[addr], 1);
    let fetched = transport.fetch_block(proposal.hash()).await;
    assert_eq!(fetched.as_ref(), Some(&proposal));

    assert_eq!(transport.fetch_block(&[0xAB; 32]).await, None);
    println!("✅ known block served, unknown hash answered with nothing");
}

// ========================================
// TEST 2: GOSSIP FORWARDING
// ========================================
#[tokio::test]
async fn test_gossip_reaches_event_channel() {
    println!("\n🧪 TEST 2: gossip forwarding");
    let (addr, mut events) = start_node(Arc::new(SharedBlocks::new())).await;
    let transport = transport_to(&[addr], 1);

    let key = PublicKey([7; 32]);
    assert_eq!(transport.broadcast_admission_request(key).await, 1);
    let proposal = sample_proposal(2);
    assert_eq!(transport.broadcast_block_proposal(proposal.clone()).await, 1);

    let mut received = Vec::new();
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            NetworkEvent::Inbound { message, from } => {
                assert!(from.ip().is_loopback());
                received.push(message);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    // Each message rides its own connection, so arrival order is not fixed.
    assert!(received.contains(&Message::AddUser(key)));
    assert!(received.contains(&Message::CreateBlock(proposal)));
    println!("✅ both messages forwarded");
}

// ========================================
// TEST 3: PLURALITY VOTE
// ========================================
#[tokio::test]
async fn test_request_most_likely_takes_plurality() {
    println!("\n🧪 TEST 3: plurality");
    let honest = sample_proposal(3);
    let other = sample_proposal(4);

    // Receivers stay alive; a closed channel stops the server.
    let mut peers = Vec::new();
    let mut inboxes = Vec::new();
    for answer in [Some(honest.clone()), Some(honest.clone()), Some(other), None] {
        let (addr, events) = start_node(Arc::new(FixedAnswer(answer))).await;
        peers.push(addr);
        inboxes.push(events);
    }
    let transport = transport_to(&peers, 4);

    let request = Message::Request(Request::GetBlock { hash: *honest.hash() });
    let reply = transport
        .request_most_likely(&request, |m| matches!(m, Message::Response(Some(_))))
        .await;
    assert_eq!(reply, Some(Message::Response(Some(honest))));
    println!("✅ two votes beat one, the empty answer did not count");
}

// ========================================
// TEST 4: WRONG-HASH ANSWERS
// ========================================
#[tokio::test]
async fn test_fetch_block_rejects_mismatched_answer() {
    println!("\n🧪 TEST 4: mismatched answer");
    let liar = sample_proposal(5);
    let (addr, _events) = start_node(Arc::new(FixedAnswer(Some(liar)))).await;
    let transport = transport_to(&[addr], 1);

    assert_eq!(transport.fetch_block(&[0x11; 32]).await, None);
    println!("✅ envelope for another block ignored");
}
