use crate::message::MAX_MESSAGE_BYTES;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("timed out")]
    Timeout,
    #[error("peer closed the connection without replying")]
    NoReply,
    #[error("message exceeds {} bytes", MAX_MESSAGE_BYTES)]
    TooLarge,
}

impl From<tokio::time::error::Elapsed> for TransportError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        TransportError::Timeout
    }
}
