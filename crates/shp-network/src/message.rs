// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - WIRE MESSAGES
//
// Envelope: { "type": <string>, "data": <payload> }, one JSON object per
// line. Decoding is strict; anything else is dropped at the boundary.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};
use shp_consensus::PaymentRequest;
use shp_core::encoding::b64_hash;
use shp_core::{BlockProposal, Hash, PublicKey, Transaction};

/// Largest line a peer may send.
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Request {
    GetBlock {
        #[serde(with = "b64_hash")]
        hash: Hash,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    /// Answered on the same connection with a `Response`.
    Request(Request),
    Response(Option<BlockProposal>),
    /// Ask block producers to admit this key.
    AddUser(PublicKey),
    /// Local instruction: pay `amount` to `receiver`.
    ReqSendMoney { receiver: PublicKey, amount: u64 },
    /// Payer → everyone: the receiver should build and sign this transfer.
    ReqGetMoney(PaymentRequest),
    /// Signed by the receiver; ready for a block.
    TransactionVerified(Transaction),
    CreateBlock(BlockProposal),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Request(_) => "request",
            Message::Response(_) => "response",
            Message::AddUser(_) => "add_user",
            Message::ReqSendMoney { .. } => "req_send_money",
            Message::ReqGetMoney(_) => "req_get_money",
            Message::TransactionVerified(_) => "transaction_verified",
            Message::CreateBlock(_) => "create_block",
        }
    }

    /// One line, newline-terminated.
    pub fn to_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }

    /// Trailing whitespace (the newline) is accepted.
    pub fn from_line(line: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(line)
    }
}
