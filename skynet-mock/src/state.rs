/// In-memory registry and file store

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::types::RegistryUpdate;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unsupported key algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("malformed {0}")]
    Malformed(&'static str),

    #[error("signature does not verify")]
    InvalidSignature,

    #[error("revision {submitted} is not greater than stored revision {stored}")]
    RevisionTooLow { submitted: u64, stored: u64 },
}

/// A registry entry as the portal keeps it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub data: Vec<u8>,
    pub revision: u64,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone)]
struct StoredFile {
    content_type: String,
    bytes: Vec<u8>,
}

/// (public key hex, data key hash hex)
type RegistryKey = (String, String);

#[derive(Debug, Default)]
pub struct PortalState {
    registry: RwLock<HashMap<RegistryKey, StoredEntry>>,
    files: RwLock<HashMap<String, StoredFile>>,
}

impl PortalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `publickey` (`ed25519:<hex>` or bare hex) and data key hash
    pub async fn lookup(&self, publickey: &str, datakey: &str) -> Option<StoredEntry> {
        let key = (normalize_key(publickey), datakey.to_lowercase());
        self.registry.read().await.get(&key).cloned()
    }

    /// Verify and store an update; revisions must strictly increase
    pub async fn update(&self, update: &RegistryUpdate) -> Result<u64, RegistryError> {
        if update.publickey.algorithm != "ed25519" {
            return Err(RegistryError::UnsupportedAlgorithm(
                update.publickey.algorithm.clone(),
            ));
        }
        let key_bytes: [u8; 32] = update
            .publickey
            .key
            .as_slice()
            .try_into()
            .map_err(|_| RegistryError::Malformed("public key"))?;
        let public_key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|_| RegistryError::Malformed("public key"))?;
        let data_key_hash: [u8; 32] = hex::decode(&update.datakey)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(RegistryError::Malformed("data key"))?;
        let signature: [u8; 64] = update
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| RegistryError::Malformed("signature"))?;

        let digest = hash_registry_entry(&data_key_hash, &update.data, update.revision);
        public_key
            .verify(&digest, &Signature::from_bytes(&signature))
            .map_err(|_| RegistryError::InvalidSignature)?;

        let key = (hex::encode(key_bytes), hex::encode(data_key_hash));
        let mut registry = self.registry.write().await;
        if let Some(stored) = registry.get(&key) {
            if update.revision <= stored.revision {
                return Err(RegistryError::RevisionTooLow {
                    submitted: update.revision,
                    stored: stored.revision,
                });
            }
        }
        registry.insert(
            key,
            StoredEntry {
                data: update.data.clone(),
                revision: update.revision,
                signature: update.signature.clone(),
            },
        );
        Ok(update.revision)
    }

    /// Replace an entry without any checks, for simulating a misbehaving portal
    pub async fn overwrite(&self, publickey: &str, datakey: &str, entry: StoredEntry) {
        let key = (normalize_key(publickey), datakey.to_lowercase());
        self.registry.write().await.insert(key, entry);
    }

    /// Store a file under its content-addressed skylink
    pub async fn store_file(&self, bytes: Vec<u8>, content_type: String) -> (String, [u8; 32]) {
        let merkle_root = blake2b_256(&bytes);
        let mut raw = [0u8; 34];
        raw[2..].copy_from_slice(&merkle_root);
        let skylink = URL_SAFE_NO_PAD.encode(raw);

        self.files.write().await.insert(
            skylink.clone(),
            StoredFile {
                content_type,
                bytes,
            },
        );
        (skylink, merkle_root)
    }

    /// File bytes and content type behind a skylink
    pub async fn file(&self, skylink: &str) -> Option<(String, Vec<u8>)> {
        self.files
            .read()
            .await
            .get(skylink)
            .map(|file| (file.content_type.clone(), file.bytes.clone()))
    }

    pub async fn entry_count(&self) -> usize {
        self.registry.read().await.len()
    }

    pub async fn file_count(&self) -> usize {
        self.files.read().await.len()
    }
}

fn normalize_key(publickey: &str) -> String {
    publickey
        .strip_prefix("ed25519:")
        .unwrap_or(publickey)
        .to_lowercase()
}

fn blake2b_256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Registry entry hash: data key hash, length-prefixed data, revision (LE)
pub fn hash_registry_entry(data_key_hash: &[u8; 32], data: &[u8], revision: u64) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data_key_hash);
    hasher.update((data.len() as u64).to_le_bytes());
    hasher.update(data);
    hasher.update(revision.to_le_bytes());
    hasher.finalize().into()
}
