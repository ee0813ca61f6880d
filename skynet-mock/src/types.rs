/// Skynet portal wire types
///
/// Field names and encodings match what a real portal accepts and returns.

use serde::{Deserialize, Serialize};

/// Query string of GET /skynet/registry
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryQuery {
    /// `ed25519:<hex>`
    pub publickey: String,
    /// Hex-encoded data key hash
    pub datakey: String,
}

/// Response of GET /skynet/registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntryResponse {
    pub data: String,
    pub revision: u64,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryPublicKey {
    pub algorithm: String,
    pub key: Vec<u8>,
}

/// Body of POST /skynet/registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryUpdate {
    pub publickey: RegistryPublicKey,
    pub datakey: String,
    pub revision: u64,
    pub data: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Response of POST /skynet/skyfile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkyfileUploadResponse {
    pub skylink: String,
    pub merkleroot: String,
    pub bitfield: u16,
}
