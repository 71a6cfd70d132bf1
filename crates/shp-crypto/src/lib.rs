// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - CRYPTOGRAPHY MODULE
//
// The single hash and signature scheme every ledger record relies on.
// - SHA3-256 hashing plus a length-prefixed multi-field hasher
// - Ed25519 key generation (random and deterministic from seed)
// - Message signing and verification
// - Base64 public key strings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha3::{Digest, Sha3_256};
use thiserror::Error;
use zeroize::Zeroize;

/// Output length of [`hash`] in bytes.
pub const HASH_LEN: usize = 32;

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Domain separator mixed into seed-derived keys.
const SEED_DOMAIN: &[u8] = b"shp-ed25519-keygen-v1";

/// A SHA3-256 digest.
pub type Hash = [u8; HASH_LEN];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key format")]
    InvalidKey,
    #[error("invalid key encoding: {0}")]
    InvalidEncoding(String),
    #[error("seed must be at least 32 bytes, got {0}")]
    SeedTooShort(usize),
    #[error("signature verification failed")]
    VerificationFailed,
}

// ─────────────────────────────────────────────────────────────────
// HASHING
// ─────────────────────────────────────────────────────────────────

/// SHA3-256 of `data`.
pub fn hash(data: &[u8]) -> Hash {
    Sha3_256::digest(data).into()
}

/// Hashes a sequence of fields under a one-byte domain tag.
///
/// Each field is prefixed with its length as a little-endian u64, so
/// `("ab", "c")` and `("a", "bc")` never collide.
#[derive(Clone)]
pub struct FieldHasher {
    inner: Sha3_256,
}

impl FieldHasher {
    pub fn new(tag: u8) -> Self {
        let mut inner = Sha3_256::new();
        inner.update([tag]);
        Self { inner }
    }

    pub fn field(mut self, bytes: &[u8]) -> Self {
        self.inner.update((bytes.len() as u64).to_le_bytes());
        self.inner.update(bytes);
        self
    }

    pub fn u64(self, value: u64) -> Self {
        self.field(&value.to_le_bytes())
    }

    pub fn finish(self) -> Hash {
        self.inner.finalize().into()
    }
}

// ─────────────────────────────────────────────────────────────────
// KEYS AND SIGNATURES
// ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct KeyPair {
    pub public_key: Vec<u8>,
    pub secret_key: Vec<u8>,
}

/// SECURITY: Zeroize secret key from memory on drop.
impl Drop for KeyPair {
    fn drop(&mut self) {
        self.secret_key.zeroize();
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &encode_public_key(&self.public_key))
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        sign_message(message, &self.secret_key)
    }

    /// Base64 form of the public key, as carried on the wire.
    pub fn public_key_string(&self) -> String {
        encode_public_key(&self.public_key)
    }

    /// Hex form of the secret key for key files.
    pub fn secret_hex(&self) -> String {
        hex::encode(&self.secret_key)
    }
}

fn from_signing_key(signing: SigningKey) -> KeyPair {
    KeyPair {
        public_key: signing.verifying_key().to_bytes().to_vec(),
        secret_key: signing.to_bytes().to_vec(),
    }
}

/// Generate a new random Ed25519 key pair.
pub fn generate_keypair() -> KeyPair {
    from_signing_key(SigningKey::generate(&mut OsRng))
}

/// Generate a DETERMINISTIC key pair from seed material.
///
/// `secret = SHA3-256(SEED_DOMAIN || seed)`; same seed, same key.
pub fn generate_keypair_from_seed(seed: &[u8]) -> Result<KeyPair, CryptoError> {
    if seed.len() < 32 {
        return Err(CryptoError::SeedTooShort(seed.len()));
    }
    let mut hasher = Sha3_256::new();
    hasher.update(SEED_DOMAIN);
    hasher.update(seed);
    let mut derived: [u8; 32] = hasher.finalize().into();
    let keypair = from_signing_key(SigningKey::from_bytes(&derived));
    derived.zeroize();
    Ok(keypair)
}

/// Rebuild a key pair from a 32-byte secret.
pub fn keypair_from_secret(secret_bytes: &[u8]) -> Result<KeyPair, CryptoError> {
    let secret: [u8; 32] = secret_bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKey)?;
    Ok(from_signing_key(SigningKey::from_bytes(&secret)))
}

/// Rebuild a key pair from the hex text of a key file.
pub fn keypair_from_hex(text: &str) -> Result<KeyPair, CryptoError> {
    let mut bytes =
        hex::decode(text.trim()).map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
    let result = keypair_from_secret(&bytes);
    bytes.zeroize();
    result
}

pub fn sign_message(message: &[u8], secret_key_bytes: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let secret: [u8; 32] = secret_key_bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKey)?;
    let signing = SigningKey::from_bytes(&secret);
    Ok(signing.sign(message).to_bytes().to_vec())
}

/// Verify an Ed25519 signature. Malformed keys or signatures verify as false.
pub fn verify_signature(message: &[u8], signature_bytes: &[u8], public_key_bytes: &[u8]) -> bool {
    let pk_array: [u8; PUBLIC_KEY_LEN] = match public_key_bytes.try_into() {
        Ok(a) => a,
        Err(_) => return false,
    };
    let vk = match VerifyingKey::from_bytes(&pk_array) {
        Ok(k) => k,
        Err(_) => return false,
    };
    let sig = match Signature::from_slice(signature_bytes) {
        Ok(s) => s,
        Err(_) => return false,
    };
    vk.verify(message, &sig).is_ok()
}

// ─────────────────────────────────────────────────────────────────
// KEY STRINGS
// ─────────────────────────────────────────────────────────────────

pub fn encode_public_key(public_key_bytes: &[u8]) -> String {
    BASE64.encode(public_key_bytes)
}

pub fn decode_public_key(text: &str) -> Result<[u8; PUBLIC_KEY_LEN], CryptoError> {
    let bytes = BASE64
        .decode(text)
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
    bytes.try_into().map_err(|_| CryptoError::InvalidKey)
}
