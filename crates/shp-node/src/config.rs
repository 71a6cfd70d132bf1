// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - NODE CONFIGURATION
//
// Layered: TOML file, then SHP_* environment variables, then command-line
// flags. Every layer only overrides what it names.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use shp_consensus::{ConsensusParams, GenesisAccount};
use shp_core::{PublicKey, BOOTSTRAP_MONEY, USER_ADD_BROADCAST_PERIOD};
use shp_network::{
    Beacon, DiscoveryConfig, TransportConfig, DEFAULT_BEACON_PERIOD, DEFAULT_DISCOVERY_PORT,
    DEFAULT_MULTICAST_GROUP, MIN_REQ_ANS, MIN_REQ_TIME,
};
use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LISTEN_PORT: u16 = 47_800;

const KEY_FILE_NAME: &str = "node_key.hex";
const DB_DIR_NAME: &str = "chain_db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub enabled: bool,
    pub group: Ipv4Addr,
    pub port: u16,
    pub period_secs: u64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            group: DEFAULT_MULTICAST_GROUP,
            port: DEFAULT_DISCOVERY_PORT,
            period_secs: DEFAULT_BEACON_PERIOD.as_secs(),
        }
    }
}

/// How `request_most_likely` polls peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSettings {
    pub quorum: usize,
    pub gather_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for RequestSettings {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            quorum: MIN_REQ_ANS,
            gather_timeout_ms: MIN_REQ_TIME.as_millis() as u64,
            connect_timeout_ms: transport.connect_timeout.as_millis() as u64,
            request_timeout_ms: transport.request_timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node_id: String,
    pub data_dir: PathBuf,
    /// Defaults to `<data_dir>/node_key.hex`.
    pub key_file: Option<PathBuf>,
    pub listen_addr: IpAddr,
    pub listen_port: u16,
    /// Address put in discovery beacons.
    pub advertise_ip: IpAddr,
    /// Static peers, on top of whatever discovery finds.
    pub peers: Vec<SocketAddr>,
    /// First node of a new network: with no genesis list, fund our own key.
    pub bootstrap: bool,
    pub round_interval_ms: u64,
    pub admission_broadcast_secs: u64,
    /// Hashes spent on pending proof of work per round.
    pub pow_slice_attempts: u64,
    pub discovery: DiscoverySettings,
    pub request: RequestSettings,
    pub consensus: ConsensusParams,
    pub genesis: Vec<GenesisAccount>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "shp-node".to_string(),
            data_dir: PathBuf::from("shp_data"),
            key_file: None,
            listen_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port: DEFAULT_LISTEN_PORT,
            advertise_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            peers: Vec::new(),
            bootstrap: false,
            round_interval_ms: 1_000,
            admission_broadcast_secs: USER_ADD_BROADCAST_PERIOD,
            pow_slice_attempts: 50_000,
            discovery: DiscoverySettings::default(),
            request: RequestSettings::default(),
            consensus: ConsensusParams::default(),
            genesis: Vec::new(),
        }
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var,
        reason: e.to_string(),
    })
}

impl NodeConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply `SHP_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SHP_NODE_ID") {
            self.node_id = v;
        }
        if let Some(v) = lookup("SHP_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SHP_KEY_FILE") {
            self.key_file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("SHP_LISTEN_ADDR") {
            self.listen_addr = parse_var("SHP_LISTEN_ADDR", &v)?;
        }
        if let Some(v) = lookup("SHP_LISTEN_PORT") {
            self.listen_port = parse_var("SHP_LISTEN_PORT", &v)?;
        }
        if let Some(v) = lookup("SHP_ADVERTISE_IP") {
            self.advertise_ip = parse_var("SHP_ADVERTISE_IP", &v)?;
        }
        if let Some(v) = lookup("SHP_PEERS") {
            self.peers = v
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_var("SHP_PEERS", s))
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = lookup("SHP_BOOTSTRAP") {
            self.bootstrap = parse_var("SHP_BOOTSTRAP", &v)?;
        }
        if let Some(v) = lookup("SHP_DISCOVERY") {
            self.discovery.enabled = parse_var("SHP_DISCOVERY", &v)?;
        }
        if let Some(v) = lookup("SHP_POW_BITS") {
            self.consensus.pow_bits = parse_var("SHP_POW_BITS", &v)?;
        }
        if let Some(v) = lookup("SHP_ROUND_INTERVAL_MS") {
            self.round_interval_ms = parse_var("SHP_ROUND_INTERVAL_MS", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.node_id.trim().is_empty() {
            return invalid("node_id cannot be empty");
        }
        if self.round_interval_ms == 0 {
            return invalid("round_interval_ms must be > 0");
        }
        if self.admission_broadcast_secs == 0 {
            return invalid("admission_broadcast_secs must be > 0");
        }
        if self.pow_slice_attempts == 0 {
            return invalid("pow_slice_attempts must be > 0");
        }
        if self.discovery.enabled && self.discovery.period_secs == 0 {
            return invalid("discovery.period_secs must be > 0");
        }
        if self.request.quorum == 0 {
            return invalid("request.quorum must be > 0");
        }
        if self.request.gather_timeout_ms == 0
            || self.request.connect_timeout_ms == 0
            || self.request.request_timeout_ms == 0
        {
            return invalid("request timeouts must be > 0");
        }
        self.consensus.validate().map_err(ConfigError::Invalid)?;
        let mut seen = HashSet::new();
        for account in &self.genesis {
            if !seen.insert(account.public_key) {
                return Err(ConfigError::Invalid(format!(
                    "genesis lists {} twice",
                    account.public_key
                )));
            }
        }
        Ok(())
    }

    pub fn key_path(&self) -> PathBuf {
        self.key_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(KEY_FILE_NAME))
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_DIR_NAME)
    }

    pub fn listen_socket(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.listen_port)
    }

    /// The allocation to start from. A bootstrap node with no list funds itself.
    pub fn genesis_accounts(&self, own_key: PublicKey) -> Vec<GenesisAccount> {
        if self.genesis.is_empty() && self.bootstrap {
            return vec![GenesisAccount {
                public_key: own_key,
                money: BOOTSTRAP_MONEY,
            }];
        }
        self.genesis.clone()
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            connect_timeout: Duration::from_millis(self.request.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request.request_timeout_ms),
            gather_timeout: Duration::from_millis(self.request.gather_timeout_ms),
            quorum: self.request.quorum,
        }
    }

    /// `port` is the port actually bound, which differs from the configured
    /// one when that was 0.
    pub fn discovery_config(&self, uid: String, port: u16) -> DiscoveryConfig {
        DiscoveryConfig {
            group: self.discovery.group,
            port: self.discovery.port,
            period: Duration::from_secs(self.discovery.period_secs),
            beacon: Beacon {
                ip: self.advertise_ip.to_string(),
                port,
                uid,
            },
        }
    }
}
