// Skynet portal request/response types

use serde::{Deserialize, Serialize};

use crate::crypto::{hash_registry_entry, PublicKey};
use crate::error::SkynetError;

/// Registry entry before signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Blake2b-256 hash of the data key
    pub data_key_hash: [u8; 32],
    /// Entry payload (for SkyDB: raw skylink bytes)
    pub data: Vec<u8>,
    /// Strictly increasing per (public key, data key)
    pub revision: u64,
}

impl RegistryEntry {
    pub fn digest(&self) -> [u8; 32] {
        hash_registry_entry(&self.data_key_hash, &self.data, self.revision)
    }
}

/// Registry entry as returned by a lookup, signature already verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRegistryEntry {
    pub entry: RegistryEntry,
    pub signature: Vec<u8>,
}

/// GET /skynet/registry response body
#[derive(Debug, Deserialize, Serialize)]
pub struct RegistryLookupResponse {
    /// Hex-encoded entry data
    pub data: String,
    pub revision: u64,
    /// Hex-encoded ed25519 signature
    pub signature: String,
}

impl RegistryLookupResponse {
    /// Decode and verify against the key the entry was requested for
    pub fn into_signed_entry(
        self,
        public_key: &PublicKey,
        data_key_hash: [u8; 32],
    ) -> Result<SignedRegistryEntry, SkynetError> {
        let entry = RegistryEntry {
            data_key_hash,
            data: hex::decode(&self.data)?,
            revision: self.revision,
        };
        let signature = hex::decode(&self.signature)?;
        public_key.verify(&entry.digest(), &signature)?;
        Ok(SignedRegistryEntry { entry, signature })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegistryPublicKey {
    pub algorithm: String,
    pub key: Vec<u8>,
}

/// POST /skynet/registry request body
#[derive(Debug, Serialize, Deserialize)]
pub struct RegistryUpdateRequest {
    pub publickey: RegistryPublicKey,
    /// Hex-encoded data key hash
    pub datakey: String,
    pub revision: u64,
    pub data: Vec<u8>,
    pub signature: Vec<u8>,
}

impl RegistryUpdateRequest {
    pub fn new(public_key: &PublicKey, entry: &RegistryEntry, signature: &[u8]) -> Self {
        Self {
            publickey: RegistryPublicKey {
                algorithm: "ed25519".to_string(),
                key: public_key.as_bytes().to_vec(),
            },
            datakey: hex::encode(entry.data_key_hash),
            revision: entry.revision,
            data: entry.data.clone(),
            signature: signature.to_vec(),
        }
    }
}

/// POST /skynet/skyfile response body
#[derive(Debug, Deserialize, Serialize)]
pub struct UploadResponse {
    pub skylink: String,
    #[serde(default)]
    pub merkleroot: String,
    #[serde(default)]
    pub bitfield: u16,
}
