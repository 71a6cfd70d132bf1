// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - PROPOSER LOTTERY
//
// One ticket ("heart") per (timestamp, key). A ticket wins when its value
// is below money × difficulty_factor, so the odds scale with stake.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::encoding::{b64_hash, EncodingError, PublicKey, TAG_TICKET};
use serde::{Deserialize, Serialize};
use shp_crypto::{FieldHasher, Hash};
use std::ops::RangeInclusive;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TicketWire", into = "TicketWire")]
pub struct LotteryTicket {
    timestamp: u64,
    public_key: PublicKey,
    hash: Hash,
}

#[derive(Serialize, Deserialize)]
struct TicketWire {
    timestamp: u64,
    public_key: PublicKey,
    #[serde(with = "b64_hash")]
    hash: Hash,
}

impl TryFrom<TicketWire> for LotteryTicket {
    type Error = EncodingError;

    fn try_from(wire: TicketWire) -> Result<Self, Self::Error> {
        let ticket = LotteryTicket::draw(wire.timestamp, wire.public_key);
        if ticket.hash != wire.hash {
            return Err(EncodingError::HashMismatch("ticket hash"));
        }
        Ok(ticket)
    }
}

impl From<LotteryTicket> for TicketWire {
    fn from(t: LotteryTicket) -> Self {
        TicketWire {
            timestamp: t.timestamp,
            public_key: t.public_key,
            hash: t.hash,
        }
    }
}

/// Winning bound for a given stake. Saturates rather than wrapping.
pub fn threshold(money: u64, difficulty_factor: u128) -> u128 {
    (money as u128).saturating_mul(difficulty_factor)
}

impl LotteryTicket {
    pub fn draw(timestamp: u64, public_key: PublicKey) -> Self {
        let hash = FieldHasher::new(TAG_TICKET)
            .u64(timestamp)
            .field(public_key.as_bytes())
            .finish();
        Self {
            timestamp,
            public_key,
            hash,
        }
    }

    /// Best (lowest) ticket a key can draw over a window of timestamps.
    pub fn best_in(window: RangeInclusive<u64>, public_key: PublicKey) -> Option<Self> {
        window
            .map(|t| LotteryTicket::draw(t, public_key))
            .min_by_key(|t| t.value())
    }

    /// Leading 128 bits of the hash, big-endian.
    pub fn value(&self) -> u128 {
        let mut head = [0u8; 16];
        head.copy_from_slice(&self.hash[..16]);
        u128::from_be_bytes(head)
    }

    pub fn wins(&self, money: u64, difficulty_factor: u128) -> bool {
        self.value() < threshold(money, difficulty_factor)
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }
}
