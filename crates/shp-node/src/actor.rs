// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - LEDGER ACTOR
//
// The single owner of NodeState. Inbound messages, round ticks and
// admission ticks all arrive on one channel and are handled in order on a
// dedicated thread, so accumulator and chain mutation never interleave.
// - Outbound gossip is spawned onto the runtime and never awaited here
// - Missing ancestors are fetched synchronously (bounded by the request
//   timeouts) while the fork walk runs
// - Every tip change is persisted and published to the block server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::db::ChainStore;
use crate::error::NodeError;
use shp_consensus::{LedgerError, NodeState, ProposalVerdict, ProposeOutcome};
use shp_core::encoding::short_hex;
use shp_core::{BlockProposal, Hash};
use shp_network::{Message, NetworkEvent, SharedBlocks, Transport};
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum Input {
    Network(NetworkEvent),
    /// Round boundary: settle the candidate, then try to propose.
    RoundTick,
    /// Re-announce our key while we are not registered.
    AdmissionTick,
    Shutdown,
}

pub struct Ledger {
    state: NodeState,
    store: ChainStore,
    transport: Transport,
    blocks: Arc<SharedBlocks>,
    runtime: Handle,
    pow_slice_attempts: u64,
    cancel: Arc<AtomicBool>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl Ledger {
    pub fn new(
        state: NodeState,
        store: ChainStore,
        transport: Transport,
        blocks: Arc<SharedBlocks>,
        runtime: Handle,
        pow_slice_attempts: u64,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        let ledger = Self {
            state,
            store,
            transport,
            blocks,
            runtime,
            pow_slice_attempts,
            cancel,
        };
        ledger.publish_blocks();
        ledger
    }

    /// Blocking loop; returns when asked to shut down or every sender is gone.
    pub fn run(mut self, mut inbox: mpsc::Receiver<Input>) -> Result<(), NodeError> {
        log::info!(
            "📦 Ledger running at #{} {}",
            self.state.height(),
            short_hex(self.state.tip_hash())
        );
        while let Some(input) = inbox.blocking_recv() {
            if matches!(input, Input::Shutdown) {
                break;
            }
            let before = *self.state.tip_hash();
            let republish = self.handle(input);
            if self.state.tip_hash() != &before {
                if let Err(e) = self.store.save(&self.state.persisted()) {
                    log::error!("🚨 Failed to persist chain: {}", e);
                }
                self.publish_blocks();
            } else if republish {
                self.publish_blocks();
            }
        }
        self.store.save(&self.state.persisted())?;
        self.store.flush()?;
        log::info!("🛑 Ledger stopped at #{}", self.state.height());
        Ok(())
    }

    /// Returns true when the servable block set changed without a tip move.
    fn handle(&mut self, input: Input) -> bool {
        match input {
            Input::RoundTick => {
                self.on_round();
                false
            }
            Input::AdmissionTick => {
                self.announce_admission();
                false
            }
            Input::Network(NetworkEvent::PeerDiscovered(addr)) => {
                log::debug!("📡 New peer {}", addr);
                self.announce_admission();
                false
            }
            Input::Network(NetworkEvent::Inbound { message, from }) => self.on_message(message, from),
            Input::Shutdown => false,
        }
    }

    fn on_round(&mut self) {
        if let Err(e) = self.state.finalize_round() {
            e.log("round finalization");
        }
        match self.state.propose(unix_now()) {
            Ok(ProposeOutcome::Proposed(proposal)) => self.gossip_block(proposal),
            Ok(ProposeOutcome::PendingWork) => self.grind(),
            Ok(_) => {}
            Err(e) => e.log("proposal"),
        }
    }

    /// One bounded slice of proof-of-work on our own pending block.
    fn grind(&mut self) {
        match self.state.work_on_pending(self.pow_slice_attempts, &self.cancel) {
            Ok(Some(proposal)) => {
                log::info!("⛏️ Solved own block #{}", proposal.block.index());
                self.gossip_block(proposal);
            }
            Ok(None) => {}
            Err(e) => e.log("proof of work"),
        }
    }

    fn gossip_block(&self, proposal: BlockProposal) {
        let transport = self.transport.clone();
        self.runtime.spawn(async move {
            let index = proposal.block.index();
            let sent = transport.broadcast_block_proposal(proposal).await;
            log::debug!("📡 Block #{} sent to {} peers", index, sent);
        });
    }

    fn announce_admission(&self) {
        let Some(key) = self.state.admission_request() else {
            return;
        };
        let transport = self.transport.clone();
        self.runtime.spawn(async move {
            transport.broadcast_admission_request(key).await;
        });
    }

    fn on_message(&mut self, message: Message, from: SocketAddr) -> bool {
        match message {
            Message::CreateBlock(proposal) => return self.on_proposal(proposal),
            Message::AddUser(key) => match self.state.submit_admission(key) {
                Ok(()) => log::debug!("🤝 Admission queued for {}", key),
                Err(e) => log::debug!("Admission for {} skipped: {}", key, e),
            },
            Message::ReqSendMoney { receiver, amount } => {
                if !from.ip().is_loopback() {
                    log::warn!("⚠️ Ignoring payment instruction from remote {}", from);
                    return false;
                }
                match self.state.payment_request(receiver, amount) {
                    Ok(request) => {
                        let transport = self.transport.clone();
                        self.runtime.spawn(async move {
                            transport.broadcast_transaction_request(request).await;
                        });
                        log::info!("💸 Asked {} to sign a transfer of {}", receiver, amount);
                    }
                    Err(e) => log::warn!("⚠️ Cannot pay {} to {}: {}", amount, receiver, e),
                }
            }
            Message::ReqGetMoney(request) => match self.state.accept_payment_request(&request) {
                Ok(Some(tx)) => {
                    let transport = self.transport.clone();
                    self.runtime.spawn(async move {
                        transport.broadcast_transaction_verified(tx).await;
                    });
                }
                Ok(None) => {}
                Err(e) => e.log("payment request"),
            },
            Message::TransactionVerified(tx) => match self.state.submit_transaction(tx) {
                Ok(hash) => log::debug!("📥 Queued transaction {}", short_hex(&hash)),
                Err(e) => LedgerError::from(e).log("transaction"),
            },
            Message::Request(_) | Message::Response(_) => {
                log::debug!("Unsolicited {} from {}", message.kind(), from);
            }
        }
        false
    }

    fn on_proposal(&mut self, proposal: BlockProposal) -> bool {
        let index = proposal.block.index();
        let transport = self.transport.clone();
        let runtime = self.runtime.clone();
        let mut fetch = move |hash: &Hash| runtime.block_on(transport.fetch_block(hash));
        match self.state.on_block_proposal(proposal, unix_now(), &mut fetch) {
            Ok(ProposalVerdict::Buffered) => true,
            Ok(ProposalVerdict::Reorganized { depth, tip }) => {
                log::info!("🔀 Switched branch at depth {}, tip {}", depth, short_hex(&tip));
                false
            }
            Ok(verdict) => {
                log::debug!("Proposal #{}: {:?}", index, verdict);
                false
            }
            Err(e) => {
                e.log("block proposal");
                false
            }
        }
    }

    /// Expose the chain window and the buffered candidate to `get_block`.
    fn publish_blocks(&self) {
        let mut served = self.state.served_proposals();
        served.extend(self.state.round_candidate().cloned());
        self.blocks.replace_all(served);
    }
}
