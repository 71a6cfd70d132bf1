// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - TRANSACTIONS
//
// A transfer between two registered accounts. Both sides carry their
// claimed balance proof. The RECEIVER signs, acknowledging the payment.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::balance::BalanceInfo;
use crate::encoding::{b64, TAG_TRANSACTION};
use serde::{Deserialize, Serialize};
use shp_crypto::{verify_signature, CryptoError, FieldHasher, Hash, KeyPair};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: u64,
    /// Last block index this transaction may be included at.
    pub expiration: u64,
    pub sender: BalanceInfo,
    pub receiver: BalanceInfo,
    #[serde(with = "b64")]
    pub signature: Vec<u8>,
}

impl Transaction {
    pub fn unsigned(amount: u64, expiration: u64, sender: BalanceInfo, receiver: BalanceInfo) -> Self {
        Self {
            amount,
            expiration,
            sender,
            receiver,
            signature: Vec::new(),
        }
    }

    /// Hash over everything except the proof paths and the signature.
    ///
    /// Paths are refreshed as other leaves change, so they must not move it.
    pub fn hash(&self) -> Hash {
        FieldHasher::new(TAG_TRANSACTION)
            .u64(self.amount)
            .u64(self.expiration)
            .field(&self.sender.data())
            .u64(self.sender.pos)
            .field(&self.receiver.data())
            .u64(self.receiver.pos)
            .finish()
    }

    pub fn sign(&mut self, receiver_keys: &KeyPair) -> Result<(), CryptoError> {
        if receiver_keys.public_key.as_slice() != self.receiver.public_key.as_bytes() {
            return Err(CryptoError::InvalidKey);
        }
        self.signature = receiver_keys.sign(&self.hash())?;
        Ok(())
    }

    pub fn signature_valid(&self) -> bool {
        verify_signature(
            &self.hash(),
            &self.signature,
            self.receiver.public_key.as_bytes(),
        )
    }

    /// Accounts this transaction writes to.
    pub fn touches(&self) -> [u64; 2] {
        [self.sender.pos, self.receiver.pos]
    }

    pub fn witnesses(&mut self) -> [(u64, &mut Vec<Hash>); 2] {
        [self.sender.witness(), self.receiver.witness()]
    }
}
