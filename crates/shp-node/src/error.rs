use shp_consensus::LedgerError;
use shp_crypto::CryptoError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{var}: {reason}")]
    Env { var: &'static str, reason: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("storage: {0}")]
    Storage(String),
    #[error("codec: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("node key: {0}")]
    Key(#[from] CryptoError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger thread stopped")]
    LedgerStopped,
}

impl From<sled::Error> for NodeError {
    fn from(e: sled::Error) -> Self {
        NodeError::Storage(e.to_string())
    }
}
