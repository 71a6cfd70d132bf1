// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - CANONICAL ENCODING
//
// Dictionary (JSON) form shared by the wire and by majority voting.
// - Byte fields travel as standard base64 strings
// - Object keys are emitted sorted, so equal values give equal bytes
// - Decoding of hashed records recomputes and checks their hashes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use shp_crypto::{Hash, HASH_LEN, PUBLIC_KEY_LEN};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Domain tags for every hashed record kind.
pub const TAG_LEAF: u8 = 0x00;
pub const TAG_NODE: u8 = 0x01;
pub const TAG_BALANCE: u8 = 0x02;
pub const TAG_TRANSACTION: u8 = 0x03;
pub const TAG_BLOCK_MED: u8 = 0x04;
pub const TAG_BLOCK: u8 = 0x05;
pub const TAG_TICKET: u8 = 0x06;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field}: expected {expected} bytes, got {got}")]
    Length {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{0} does not match its contents")]
    HashMismatch(&'static str),
    #[error("{0}")]
    Inconsistent(String),
}

/// Canonical bytes of any record: JSON with sorted object keys.
///
/// Going through `serde_json::Value` sorts keys (its map is ordered), so two
/// peers serializing equal values always agree byte for byte.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, EncodingError> {
    let tree = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&tree)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, EncodingError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// First six bytes in hex, for log lines.
pub fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..6])
}

pub fn hash_from_slice(field: &'static str, bytes: &[u8]) -> Result<Hash, EncodingError> {
    bytes.try_into().map_err(|_| EncodingError::Length {
        field,
        expected: HASH_LEN,
        got: bytes.len(),
    })
}

// ─────────────────────────────────────────────────────────────────
// PUBLIC KEY
// ─────────────────────────────────────────────────────────────────

/// Ed25519 public key; base64 text on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncodingError> {
        let array = bytes.try_into().map_err(|_| EncodingError::Length {
            field: "public_key",
            expected: PUBLIC_KEY_LEN,
            got: bytes.len(),
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE64.encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl FromStr for PublicKey {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE64
            .decode(s)
            .map_err(|e| EncodingError::Inconsistent(format!("public_key: {}", e)))?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────────────
// SERDE HELPERS
// ─────────────────────────────────────────────────────────────────

/// `#[serde(with = "b64")]` for `Vec<u8>`.
pub mod b64 {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        BASE64.decode(text).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "b64_hash")]` for a single digest.
pub mod b64_hash {
    use super::*;

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let bytes = super::b64::deserialize(deserializer)?;
        hash_from_slice("hash", &bytes).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "b64_hashes")]` for proof paths and root lists.
pub mod b64_hashes {
    use super::*;

    pub fn serialize<S: Serializer>(hashes: &[Hash], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(hashes.iter().map(|h| BASE64.encode(h)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Hash>, D::Error> {
        let texts = Vec::<String>::deserialize(deserializer)?;
        texts
            .iter()
            .map(|text| {
                let bytes = BASE64.decode(text).map_err(serde::de::Error::custom)?;
                hash_from_slice("hash", &bytes).map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

/// u128 as a decimal string; JSON numbers cannot carry it losslessly.
pub mod u128_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_canonical_bytes_sort_keys() {
        let mut a = HashMap::new();
        a.insert("zeta", 1);
        a.insert("alpha", 2);
        a.insert("mid", 3);
        let bytes = canonical_bytes(&a).unwrap();
        assert_eq!(bytes, br#"{"alpha":2,"mid":3,"zeta":1}"#.to_vec());
    }

    #[test]
    fn test_public_key_text_roundtrip() {
        let key = PublicKey([9u8; 32]);
        let text = key.to_string();
        assert_eq!(text.parse::<PublicKey>().unwrap(), key);
        assert!("AAAA".parse::<PublicKey>().is_err());
        assert!("%%%".parse::<PublicKey>().is_err());
    }

    #[test]
    fn test_u128_string_helper() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Wrap {
            #[serde(with = "u128_string")]
            v: u128,
        }
        let w = Wrap { v: u128::MAX };
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains(&u128::MAX.to_string()));
        assert_eq!(serde_json::from_str::<Wrap>(&json).unwrap(), w);
    }

    #[test]
    fn test_hash_list_rejects_short_entries() {
        #[derive(Deserialize, Debug)]
        struct Wrap {
            #[serde(with = "b64_hashes")]
            #[allow(dead_code)]
            v: Vec<Hash>,
        }
        assert!(serde_json::from_str::<Wrap>(r#"{"v":["AAAA"]}"#).is_err());
    }
}
