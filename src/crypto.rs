//! Key derivation and registry entry signing for SkyDB
//!
//! SkyDB documents are addressed by an ed25519 public key plus a hashed data
//! key, and every registry write carries a signature over the entry hash:
//!
//! 1. Derive 32 bytes from the seed with PBKDF2-HMAC-SHA256 (empty salt, 1000 rounds)
//! 2. Use them as the ed25519 secret seed
//! 3. Hash the data key as a length-prefixed UTF-8 string with Blake2b-256
//! 4. Hash (data key hash, length-prefixed data, revision) with Blake2b-256
//! 5. Sign the entry hash with the ed25519 key

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::fmt;

use crate::error::SkynetError;

const SEED_PBKDF2_ROUNDS: u32 = 1000;

/// Length of an ed25519 signature in bytes
pub const SIGNATURE_LENGTH: usize = 64;

/// ed25519 key pair owning a SkyDB namespace
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Derive the key pair deterministically from a seed string
    pub fn from_seed(seed: &str) -> Self {
        let mut secret = [0u8; 32];
        pbkdf2_hmac::<Sha256>(seed.as_bytes(), b"", SEED_PBKDF2_ROUNDS, &mut secret);
        Self {
            signing_key: SigningKey::from_bytes(&secret),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key())
    }

    /// Private key in the 64-byte (secret || public) hex form other Skynet tools use
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_keypair_bytes())
    }

    /// Sign an already-computed entry hash
    pub fn sign(&self, digest: &[u8; 32]) -> [u8; SIGNATURE_LENGTH] {
        self.signing_key.sign(digest).to_bytes()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key().to_hex())
            .finish_non_exhaustive()
    }
}

/// ed25519 public key identifying a SkyDB namespace
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SkynetError> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            SkynetError::invalid_entry(format!(
                "public key must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|e| SkynetError::invalid_entry(format!("invalid ed25519 public key: {}", e)))
    }

    /// Parse `ed25519:<hex>` or bare hex
    pub fn from_hex(s: &str) -> Result<Self, SkynetError> {
        let raw = s.strip_prefix("ed25519:").unwrap_or(s);
        Self::from_bytes(&hex::decode(raw)?)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Form used in registry query strings: `ed25519:<hex>`
    pub fn to_skynet_string(&self) -> String {
        format!("ed25519:{}", self.to_hex())
    }

    /// Verify a signature over an entry hash
    pub fn verify(&self, digest: &[u8; 32], signature: &[u8]) -> Result<(), SkynetError> {
        let signature: [u8; SIGNATURE_LENGTH] =
            signature.try_into().map_err(|_| SkynetError::InvalidSignature)?;
        self.0
            .verify(digest, &Signature::from_bytes(&signature))
            .map_err(|_| SkynetError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_skynet_string())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_skynet_string())
    }
}

/// Hash a data key the way the registry addresses it
pub fn hash_data_key(data_key: &str) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(encode_prefixed_bytes(data_key.as_bytes()));
    hasher.finalize().into()
}

/// Hash a registry entry for signing
pub fn hash_registry_entry(data_key_hash: &[u8; 32], data: &[u8], revision: u64) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data_key_hash);
    hasher.update(encode_prefixed_bytes(data));
    hasher.update(revision.to_le_bytes());
    hasher.finalize().into()
}

/// 8-byte little-endian length followed by the bytes
fn encode_prefixed_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + bytes.len());
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    out.extend_from_slice(bytes);
    out
}
