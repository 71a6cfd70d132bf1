// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - NODE
//
// Wires the ledger actor to the network:
// - TCP server answering block requests and forwarding gossip
// - LAN discovery beacons and listener
// - round and admission timers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use clap::Parser;
use shp_consensus::NodeState;
use shp_core::PublicKey;
use shp_network::{discovery, serve, NetworkEvent, PeerSet, SharedBlocks, Transport};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod actor;
mod config;
mod db;
mod error;
mod identity;

use actor::{Input, Ledger};
use config::NodeConfig;
use db::ChainStore;
use error::NodeError;

const INBOX_CAPACITY: usize = 1024;

#[derive(Parser, Debug)]
#[command(name = "shp-node")]
#[command(about = "StakeHeap ledger node", long_about = None)]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "SHP_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    node_id: Option<String>,

    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// TCP port to listen on (0 picks a free one)
    #[arg(short, long)]
    port: Option<u16>,

    /// Static peer, repeatable
    #[arg(long = "peer")]
    peers: Vec<SocketAddr>,

    /// Start a new network funded by this node's key
    #[arg(long)]
    bootstrap: bool,

    /// Disable multicast discovery
    #[arg(long)]
    no_discovery: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut NodeConfig) {
        if let Some(id) = &self.node_id {
            config.node_id = id.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(port) = self.port {
            config.listen_port = port;
        }
        config.peers.extend(self.peers.iter().copied());
        if self.bootstrap {
            config.bootstrap = true;
        }
        if self.no_discovery {
            config.discovery.enabled = false;
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // try_init also installs the `log` bridge for the library crates.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

fn resolve_config(args: &Args) -> Result<NodeConfig, NodeError> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::load_from_file(path)?,
        None => NodeConfig::default(),
    };
    config.apply_env()?;
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn run(config: NodeConfig) -> Result<(), NodeError> {
    std::fs::create_dir_all(&config.data_dir)?;
    let keypair = identity::load_or_create(&config.key_path())?;
    let own_key = PublicKey::from_slice(&keypair.public_key).map_err(shp_consensus::LedgerError::from)?;

    let store = ChainStore::open(config.db_path())?;
    let state = match store.load()? {
        Some(saved) => NodeState::restore(config.consensus.clone(), keypair, saved)?,
        None => {
            let state = NodeState::new(config.consensus.clone(), keypair, &config.genesis_accounts(own_key))?;
            store.save(&state.persisted())?;
            state
        }
    };

    let listener = TcpListener::bind(config.listen_socket()).await?;
    let bound = listener.local_addr()?;
    tracing::info!("🚀 {} listening on {} as {}", config.node_id, bound, own_key);

    let peers = PeerSet::with_peers(config.peers.iter().copied());
    let transport = Transport::new(peers.clone(), config.transport_config());
    let blocks = Arc::new(SharedBlocks::new());

    let (net_tx, mut net_rx) = mpsc::channel::<NetworkEvent>(INBOX_CAPACITY);
    let (inbox_tx, inbox_rx) = mpsc::channel::<Input>(INBOX_CAPACITY);

    tokio::spawn({
        let events = net_tx.clone();
        let blocks = Arc::clone(&blocks);
        async move {
            if let Err(e) = serve(listener, events, blocks).await {
                tracing::error!("🚨 Server stopped: {}", e);
            }
        }
    });

    if config.discovery.enabled {
        let uid = format!("{}-{:016x}", config.node_id, rand::random::<u64>());
        let discovery = config.discovery_config(uid, bound.port());
        tokio::spawn({
            let discovery = discovery.clone();
            async move {
                if let Err(e) = discovery::run_beacon(discovery).await {
                    tracing::warn!("⚠️ Discovery beacon stopped: {}", e);
                }
            }
        });
        tokio::spawn({
            let peers = peers.clone();
            let events = net_tx.clone();
            async move {
                if let Err(e) = discovery::run_listener(discovery, peers, events).await {
                    tracing::warn!("⚠️ Discovery listener stopped: {}", e);
                }
            }
        });
    }
    drop(net_tx);

    // Network events into the ledger inbox.
    tokio::spawn({
        let inbox = inbox_tx.clone();
        async move {
            while let Some(event) = net_rx.recv().await {
                if inbox.send(Input::Network(event)).await.is_err() {
                    break;
                }
            }
        }
    });

    spawn_ticker(inbox_tx.clone(), Duration::from_millis(config.round_interval_ms), || Input::RoundTick);
    spawn_ticker(
        inbox_tx.clone(),
        Duration::from_secs(config.admission_broadcast_secs),
        || Input::AdmissionTick,
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let ledger = Ledger::new(
        state,
        store,
        transport,
        Arc::clone(&blocks),
        tokio::runtime::Handle::current(),
        config.pow_slice_attempts,
        Arc::clone(&cancel),
    );
    let worker = std::thread::Builder::new()
        .name("shp-ledger".to_string())
        .spawn(move || ledger.run(inbox_rx))?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("🛑 Shutting down...");
    cancel.store(true, Ordering::Relaxed);
    let _ = inbox_tx.send(Input::Shutdown).await;

    tokio::task::spawn_blocking(move || worker.join())
        .await
        .map_err(|_| NodeError::LedgerStopped)?
        .map_err(|_| NodeError::LedgerStopped)?
}

fn spawn_ticker<F>(inbox: mpsc::Sender<Input>, period: Duration, make: F)
where
    F: Fn() -> Input + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if inbox.send(make()).await.is_err() {
                break;
            }
        }
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match resolve_config(&args) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}
